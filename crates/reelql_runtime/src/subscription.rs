//! Per-event subscription execution.
//!
//! A subscription binds one root field to the event sequence produced by its
//! [`SubscriptionSource`](crate::resolver::SubscriptionSource). Every payload
//! the source emits is completed against the field's sub-selections as the
//! root value, yielding one [`ExecutionResult`] per event in emission order.

use crate::executor::{
    coerce_arguments, complete_field_value, Completed, ExecCtx, ExecutionResult, Executor,
    PathSegment,
};
use crate::pubsub::Subscriber;
use crate::resolver::{Context, ResolverError};
use crate::schema::FieldDef;
use crate::selection::{Operation, OperationKind, SelectionNode};
use crate::validate::validate_operation;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Failure to start a subscription.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("operation is not a subscription")]
    NotASubscription,

    #[error("subscription operations take exactly one root field")]
    SingleRootField,

    #[error("invalid subscription request: {0}")]
    Invalid(String),

    #[error("no subscription source registered for field `{0}`")]
    MissingSource(String),

    #[error("subscription source failed: {0}")]
    Source(#[from] ResolverError),
}

impl Executor {
    /// Starts a subscription for a single-root-field operation.
    ///
    /// The returned stream yields until it is cancelled or its event channel
    /// is torn down; re-subscribing starts a fresh sequence.
    pub async fn subscribe(
        &self,
        operation: &Operation,
        ctx: &Context,
    ) -> Result<SubscriptionStream, SubscribeError> {
        if operation.kind != OperationKind::Subscription {
            return Err(SubscribeError::NotASubscription);
        }
        if let Err(errors) = validate_operation(&self.registry, operation) {
            let joined = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SubscribeError::Invalid(joined));
        }
        if operation.selections.len() != 1 {
            return Err(SubscribeError::SingleRootField);
        }
        let selection = operation.selections[0].clone();

        let Some(root_type) = self.registry.root_type(OperationKind::Subscription) else {
            return Err(SubscribeError::Invalid(
                "schema does not define a subscription root type".to_string(),
            ));
        };
        let field = match self.registry.field(root_type, &selection.name) {
            Ok(field) => field.clone(),
            Err(e) => return Err(SubscribeError::Invalid(e.to_string())),
        };
        let source = self
            .resolvers
            .source(&selection.name)
            .ok_or_else(|| SubscribeError::MissingSource(selection.name.clone()))?;

        let ecx = self.exec_ctx(ctx);
        let args = coerce_arguments(&ecx, root_type, &field, &selection.arguments)
            .map_err(SubscribeError::Invalid)?;
        let subscriber = source.subscribe(&args, ctx).await?;
        debug!(field = %selection.name, topic = subscriber.topic(), "subscription started");

        Ok(SubscriptionStream {
            ecx,
            field,
            selection,
            subscriber,
        })
    }
}

/// A live subscription: an ordered sequence of execution results.
pub struct SubscriptionStream {
    ecx: ExecCtx,
    field: FieldDef,
    selection: SelectionNode,
    subscriber: Subscriber,
}

impl SubscriptionStream {
    /// Waits for the next event and executes the subscription's selection
    /// against it. Returns `None` once the stream is cancelled.
    pub async fn next(&mut self) -> Option<ExecutionResult> {
        let payload = self.subscriber.recv().await?;

        let path = vec![PathSegment::Field(self.selection.name.clone())];
        let (completed, errors) = complete_field_value(
            self.ecx.clone(),
            self.field.clone(),
            self.selection.clone(),
            payload,
            path,
        )
        .await;

        let data = match completed {
            Completed::Value(value) => {
                let mut object = serde_json::Map::new();
                object.insert(self.selection.name.clone(), value);
                Value::Object(object)
            }
            Completed::Bubbled => Value::Null,
        };
        Some(ExecutionResult { data, errors })
    }

    /// Cancels the subscription. No event published after this point is
    /// delivered, including ones already queued.
    pub fn cancel(&mut self) {
        self.subscriber.cancel();
    }

    /// The subscribed root field name.
    pub fn field_name(&self) -> &str {
        &self.selection.name
    }

    /// The event-channel topic feeding this stream.
    pub fn topic(&self) -> &str {
        self.subscriber.topic()
    }
}

impl std::fmt::Debug for SubscriptionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionStream")
            .field("field", &self.selection.name)
            .field("topic", &self.subscriber.topic())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubsub::EventChannel;
    use crate::resolver::{FnSource, ResolverTable};
    use crate::scalar::CodecSet;
    use crate::schema::{FieldDef, ObjectDef, TypeDef, TypeRegistry};
    use serde_json::json;

    fn movie_executor(channel: &EventChannel) -> Executor {
        let mut registry = TypeRegistry::new();
        registry
            .register(TypeDef::Object(
                ObjectDef::new("Movie")
                    .field(FieldDef::new("id", "ID").non_null())
                    .field(FieldDef::new("title", "String").non_null()),
            ))
            .unwrap();
        registry
            .register(TypeDef::Object(
                ObjectDef::new("Query").field(FieldDef::new("movies", "Movie").list()),
            ))
            .unwrap();
        registry
            .register(TypeDef::Object(
                ObjectDef::new("Subscription")
                    .field(FieldDef::new("movieAdded", "Movie").non_null()),
            ))
            .unwrap();
        registry.set_query_type("Query");
        registry.set_subscription_type("Subscription");

        let mut resolvers = ResolverTable::new();
        {
            let channel = channel.clone();
            resolvers
                .register_source(
                    "movieAdded",
                    FnSource::new(move |_args, _ctx| {
                        let channel = channel.clone();
                        async move { Ok(channel.subscribe("movieAdded").await) }
                    }),
                )
                .unwrap();
        }

        Executor::new(registry, CodecSet::new(), resolvers).unwrap()
    }

    fn movie_added_operation() -> Operation {
        Operation::subscription([SelectionNode::field("movieAdded")
            .select([SelectionNode::field("id"), SelectionNode::field("title")])])
    }

    #[tokio::test]
    async fn test_one_result_per_event() {
        let channel = EventChannel::new();
        let executor = movie_executor(&channel);

        let mut stream = executor
            .subscribe(&movie_added_operation(), &Context::new())
            .await
            .unwrap();
        assert_eq!(stream.field_name(), "movieAdded");

        channel
            .publish("movieAdded", json!({"id": "789", "title": "Enter the Dragon"}))
            .await;
        channel
            .publish("movieAdded", json!({"id": "790", "title": "Fist of Fury"}))
            .await;

        let first = stream.next().await.unwrap();
        assert!(!first.has_errors());
        assert_eq!(
            first.data,
            json!({"movieAdded": {"id": "789", "title": "Enter the Dragon"}})
        );

        let second = stream.next().await.unwrap();
        assert_eq!(second.data["movieAdded"]["id"], "790");
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_registration_order() {
        let channel = EventChannel::new();
        let executor = movie_executor(&channel);
        let operation = movie_added_operation();

        let mut first = executor.subscribe(&operation, &Context::new()).await.unwrap();
        let mut second = executor.subscribe(&operation, &Context::new()).await.unwrap();

        let delivered = channel
            .publish("movieAdded", json!({"id": "789", "title": "Enter the Dragon"}))
            .await;
        assert_eq!(delivered, 2);

        assert!(first.next().await.is_some());
        assert!(second.next().await.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_stream_receives_nothing() {
        let channel = EventChannel::new();
        let executor = movie_executor(&channel);

        let mut stream = executor
            .subscribe(&movie_added_operation(), &Context::new())
            .await
            .unwrap();
        stream.cancel();

        let delivered = channel
            .publish("movieAdded", json!({"id": "789", "title": "Enter the Dragon"}))
            .await;
        assert_eq!(delivered, 0);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_event_violating_nullability_yields_null_data() {
        let channel = EventChannel::new();
        let executor = movie_executor(&channel);

        let mut stream = executor
            .subscribe(&movie_added_operation(), &Context::new())
            .await
            .unwrap();

        // `title` is non-nullable and `movieAdded` itself is non-null, so
        // the whole event's data nulls.
        channel
            .publish("movieAdded", json!({"id": "789", "title": null}))
            .await;

        let result = stream.next().await.unwrap();
        assert_eq!(result.data, Value::Null);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].path,
            vec![PathSegment::from("movieAdded"), PathSegment::from("title")]
        );
    }

    #[tokio::test]
    async fn test_subscribe_requires_single_root_field() {
        let channel = EventChannel::new();
        let executor = movie_executor(&channel);

        let operation = Operation::subscription([
            SelectionNode::field("movieAdded").select([SelectionNode::field("id")]),
            SelectionNode::field("movieAdded").select([SelectionNode::field("title")]),
        ]);

        let err = executor
            .subscribe(&operation, &Context::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubscribeError::SingleRootField));
    }

    #[tokio::test]
    async fn test_subscribe_rejects_unknown_field() {
        let channel = EventChannel::new();
        let executor = movie_executor(&channel);

        let operation = Operation::subscription([
            SelectionNode::field("actorAdded").select([SelectionNode::field("id")])
        ]);

        let err = executor
            .subscribe(&operation, &Context::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubscribeError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_subscribe_rejects_non_subscription_operation() {
        let channel = EventChannel::new();
        let executor = movie_executor(&channel);

        let operation = Operation::query([
            SelectionNode::field("movies").select([SelectionNode::field("id")])
        ]);

        let err = executor
            .subscribe(&operation, &Context::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubscribeError::NotASubscription));
    }
}
