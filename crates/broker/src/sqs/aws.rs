//! Amazon SQS transport.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::Client;
use aws_sdk_sqs::config::Credentials;
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_sqs::types::QueueAttributeName;

use crate::config::SqsSettings;
use crate::sqs::{QueueClient, ReceivedMessage};
use crate::{BrokerError, Result};

/// Error codes SQS returns for a queue URL that does not resolve, in the
/// query and JSON protocols respectively.
const NON_EXISTENT_QUEUE_CODES: [&str; 2] =
    ["AWS.SimpleQueueService.NonExistentQueue", "QueueDoesNotExist"];

/// Longest long-poll wait SQS accepts.
const MAX_WAIT_SECONDS: u64 = 20;

/// [`QueueClient`] backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsQueueClient {
    client: Client,
}

impl AwsQueueClient {
    /// Loads the shared AWS configuration (environment, profile, instance
    /// metadata) and overrides it with the region, static credentials and
    /// endpoint from `settings`.
    ///
    /// No request is sent until the first queue call.
    pub async fn connect(settings: &SqsSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let (Some(key_id), Some(secret)) =
            (&settings.access_key_id, &settings.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "order-sync-settings",
            ));
        }
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        tracing::info!(region = %settings.region, endpoint = ?settings.endpoint_url, "sqs client configured");
        Self::from_client(Client::new(&sdk_config))
    }

    /// Wraps an already configured SDK client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn describe<E: std::error::Error>(err: E) -> String {
    DisplayErrorContext(err).to_string()
}

#[async_trait]
impl QueueClient for AwsQueueClient {
    async fn queue_exists(&self, queue_url: &str) -> Result<bool> {
        let response = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::QueueArn)
            .send()
            .await;

        match response {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .and_then(|e| e.code())
                    .is_some_and(|code| NON_EXISTENT_QUEUE_CODES.contains(&code)) =>
            {
                Ok(false)
            }
            Err(err) => Err(BrokerError::Subscription {
                queue: queue_url.to_string(),
                reason: describe(&err),
            }),
        }
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>> {
        let max_messages = max_messages.clamp(1, SqsSettings::MAX_BATCH);
        let wait_seconds = wait_time.as_secs().min(MAX_WAIT_SECONDS);

        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max_messages as i32)
            .wait_time_seconds(wait_seconds as i32)
            .send()
            .await
            .map_err(|err| BrokerError::Receive {
                queue: queue_url.to_string(),
                reason: describe(&err),
            })?;

        let batch = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let Some(receipt_handle) = message.receipt_handle else {
                    tracing::warn!(queue = queue_url, message_id = ?message.message_id, "message without receipt handle skipped");
                    return None;
                };
                Some(ReceivedMessage {
                    message_id: message.message_id.unwrap_or_default(),
                    receipt_handle,
                    body: message.body.unwrap_or_default(),
                })
            })
            .collect();
        Ok(batch)
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|err| BrokerError::Acknowledge(describe(&err)))?;
        Ok(())
    }

    async fn release_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()> {
        self.client
            .change_message_visibility()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(0)
            .send()
            .await
            .map_err(|err| BrokerError::Acknowledge(describe(&err)))?;
        Ok(())
    }

    async fn send_message(&self, queue_url: &str, body: &[u8]) -> Result<()> {
        let publish_error = |reason: String| BrokerError::Publish {
            destination: queue_url.to_string(),
            reason,
        };
        let body = String::from_utf8(body.to_vec()).map_err(|e| publish_error(e.to_string()))?;

        self.client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|err| publish_error(describe(&err)))?;
        Ok(())
    }
}
