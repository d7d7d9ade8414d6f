use insta::assert_json_snapshot;

use crate::{Build, BuildConfig, Key, Queue, QueueProps, Role, Topic, TopicProps};

fn build() -> Build {
    Build::new(BuildConfig {
        account: Some("111122223333".to_string()),
        region: Some("eu-west-1".to_string()),
        assign_sids: true,
        ..BuildConfig::default()
    })
}

#[test]
fn test_snapshot_encrypted_fan_out() {
    let build = build();
    let key = Key::new(&build, "Key");
    let queue = Queue::new(
        &build,
        "Jobs",
        QueueProps {
            encryption_key: Some(key),
            ..QueueProps::default()
        },
    );
    let topic = Topic::new(&build, "Events", TopicProps::default());
    let role = Role::new(&build, "Worker");

    let grant = queue.grant_consume_messages(&role).unwrap();
    grant.apply_before(&build, "Consumer").unwrap();
    topic.subscribe_queue(&queue).unwrap();

    let output = build.resolve().unwrap();
    assert_json_snapshot!(output, @r#"
    {
      "policies": [
        {
          "id": "Worker/DefaultPolicy",
          "kind": "identity",
          "attached_to": "arn:aws:iam::111122223333:role/Worker",
          "document": {
            "Statement": [
              {
                "Action": [
                  "sqs:ReceiveMessage",
                  "sqs:ChangeMessageVisibility",
                  "sqs:GetQueueUrl",
                  "sqs:DeleteMessage",
                  "sqs:GetQueueAttributes"
                ],
                "Effect": "Allow",
                "Resource": "arn:aws:sqs:eu-west-1:111122223333:Jobs",
                "Sid": "0"
              },
              {
                "Action": "kms:Decrypt",
                "Effect": "Allow",
                "Resource": "arn:aws:kms:eu-west-1:111122223333:key/Key",
                "Sid": "1"
              }
            ],
            "Version": "2012-10-17"
          }
        },
        {
          "id": "Jobs/Policy",
          "kind": "resource",
          "attached_to": "arn:aws:sqs:eu-west-1:111122223333:Jobs",
          "document": {
            "Statement": [
              {
                "Action": "sqs:SendMessage",
                "Condition": {
                  "ArnEquals": {
                    "aws:SourceArn": "arn:aws:sns:eu-west-1:111122223333:Events"
                  }
                },
                "Effect": "Allow",
                "Principal": {
                  "Service": "sns.amazonaws.com"
                },
                "Resource": "arn:aws:sqs:eu-west-1:111122223333:Jobs",
                "Sid": "0"
              }
            ],
            "Version": "2012-10-17"
          }
        },
        {
          "id": "Key/Policy",
          "kind": "resource",
          "attached_to": "arn:aws:kms:eu-west-1:111122223333:key/Key",
          "document": {
            "Statement": [
              {
                "Action": [
                  "kms:Decrypt",
                  "kms:GenerateDataKey*"
                ],
                "Effect": "Allow",
                "Principal": {
                  "Service": "sns.amazonaws.com"
                },
                "Resource": "*",
                "Sid": "0"
              }
            ],
            "Version": "2012-10-17"
          }
        }
      ],
      "dependencies": [
        {
          "construct": "Consumer",
          "policies": [
            "Worker/DefaultPolicy"
          ]
        }
      ]
    }
    "#);
}
