//! Mutations with a client mutation id
//!
//! Wraps a mutation's business logic in a field taking a single
//! `<Name>Input!` argument and returning `<Name>Payload`. The input carries a
//! required correlation token that the payload echoes back unchanged.

use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, SchemaBuilder, TypeRef,
};
use async_graphql::{Context, Value};
use async_trait::async_trait;
use tracing::debug;

use crate::config::RelayConfig;

/// Business logic of a mutation
///
/// Receives the whole input object (correlation token included) as JSON and
/// returns the payload fields as a JSON object.
#[async_trait]
pub trait MutateAndGetPayload: Send + Sync {
    async fn mutate_and_get_payload(
        &self,
        input: serde_json::Value,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<serde_json::Value>;
}

/// Parent value of every payload field
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPayload {
    pub client_mutation_id: String,
    pub data: serde_json::Value,
}

/// Declares a mutation: its name, input fields, output fields and handler
pub struct MutationConfig {
    name: String,
    field_name: Option<String>,
    description: Option<String>,
    input_fields: Vec<InputValue>,
    output_fields: Vec<Field>,
    handler: Arc<dyn MutateAndGetPayload>,
}

/// Field plus the input and payload types it needs
pub struct MutationDefinition {
    pub field: Field,
    pub input: InputObject,
    pub payload: Object,
}

impl MutationConfig {
    pub fn new(name: impl Into<String>, handler: impl MutateAndGetPayload + 'static) -> Self {
        Self {
            name: name.into(),
            field_name: None,
            description: None,
            input_fields: Vec::new(),
            output_fields: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Field name on the mutation root; defaults to the name with a
    /// lowercase first letter
    pub fn field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn input_field(mut self, field: InputValue) -> Self {
        self.input_fields.push(field);
        self
    }

    /// Output field read from the key of the same name in the handler's result
    pub fn output_field(self, name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        let name = name.into();
        let key = name.clone();
        self.output_field_with(Field::new(name, ty, move |ctx| {
            let value = payload_value(ctx.parent_value, &key);
            FieldFuture::new(async move { value })
        }))
    }

    /// Output field with its own resolver; its parent value is
    /// [`MutationPayload`]
    pub fn output_field_with(mut self, field: Field) -> Self {
        self.output_fields.push(field);
        self
    }

    pub fn build(self, config: &RelayConfig) -> MutationDefinition {
        let id_field = config.client_mutation_id_field.clone();
        let input_name = format!("{}Input", self.name);
        let payload_name = format!("{}Payload", self.name);
        let field_name = self
            .field_name
            .unwrap_or_else(|| lower_first(&self.name));

        let mut input = InputObject::new(&input_name);
        for field in self.input_fields {
            input = input.field(field);
        }
        input = input.field(InputValue::new(
            &id_field,
            TypeRef::named_nn(TypeRef::STRING),
        ));

        let mut payload = Object::new(&payload_name);
        for field in self.output_fields {
            payload = payload.field(field);
        }
        payload = payload.field(Field::new(
            &id_field,
            TypeRef::named_nn(TypeRef::STRING),
            |ctx| {
                FieldFuture::new(async move {
                    let payload = ctx.parent_value.try_downcast_ref::<MutationPayload>()?;
                    Ok(Some(Value::from(payload.client_mutation_id.clone())))
                })
            },
        ));

        let handler = self.handler;
        let mutation = field_name.clone();
        let mut field = Field::new(field_name, TypeRef::named(&payload_name), move |ctx| {
            let handler = handler.clone();
            let id_field = id_field.clone();
            let mutation = mutation.clone();
            FieldFuture::new(async move {
                let input = ctx.args.try_get("input")?;
                let client_mutation_id = input
                    .object()?
                    .try_get(&id_field)?
                    .string()?
                    .to_string();
                let input = input.as_value().clone().into_json()?;

                debug!(
                    mutation = %mutation,
                    client_mutation_id = %client_mutation_id,
                    "Running mutation"
                );
                let data = handler.mutate_and_get_payload(input, ctx.ctx).await?;

                Ok(Some(FieldValue::owned_any(MutationPayload {
                    client_mutation_id,
                    data,
                })))
            })
        })
        .argument(InputValue::new("input", TypeRef::named_nn(&input_name)));
        if let Some(description) = self.description {
            field = field.description(description);
        }

        MutationDefinition {
            field,
            input,
            payload,
        }
    }
}

impl MutationDefinition {
    /// Add the field to the mutation root and register the input and payload
    /// types
    pub fn install(self, mutation: Object, builder: SchemaBuilder) -> (Object, SchemaBuilder) {
        (
            mutation.field(self.field),
            builder.register(self.input).register(self.payload),
        )
    }
}

fn payload_value(parent: &FieldValue<'_>, key: &str) -> async_graphql::Result<Option<Value>> {
    let payload = parent.try_downcast_ref::<MutationPayload>()?;
    match payload.data.get(key) {
        Some(json) => Ok(Some(Value::from_json(json.clone())?)),
        None => Ok(None),
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::dynamic::Schema;
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    struct Simple;

    #[async_trait]
    impl MutateAndGetPayload for Simple {
        async fn mutate_and_get_payload(
            &self,
            _input: serde_json::Value,
            _ctx: &Context<'_>,
        ) -> async_graphql::Result<serde_json::Value> {
            // a handler cannot override the echoed correlation token
            Ok(json!({ "result": 1, "clientMutationID": "forged" }))
        }
    }

    struct Delayed;

    #[async_trait]
    impl MutateAndGetPayload for Delayed {
        async fn mutate_and_get_payload(
            &self,
            _input: serde_json::Value,
            _ctx: &Context<'_>,
        ) -> async_graphql::Result<serde_json::Value> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json!({ "result": 1 }))
        }
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RenameInput {
        new_name: String,
    }

    struct Rename;

    #[async_trait]
    impl MutateAndGetPayload for Rename {
        async fn mutate_and_get_payload(
            &self,
            input: serde_json::Value,
            _ctx: &Context<'_>,
        ) -> async_graphql::Result<serde_json::Value> {
            let input: RenameInput = serde_json::from_value(input)?;
            if input.new_name.is_empty() {
                return Err("name must not be empty".into());
            }
            Ok(json!({ "name": input.new_name.to_uppercase() }))
        }
    }

    fn schema() -> Schema {
        let config = RelayConfig::default();
        let mut builder = Schema::build("Query", Some("Mutation"), None);
        let mut mutation = Object::new("Mutation");

        for definition in [
            MutationConfig::new("SimpleMutation", Simple)
                .output_field("result", TypeRef::named(TypeRef::INT))
                .build(&config),
            MutationConfig::new("SimplePromiseMutation", Delayed)
                .output_field("result", TypeRef::named(TypeRef::INT))
                .build(&config),
            MutationConfig::new("RenameShip", Rename)
                .description("Renames a ship")
                .input_field(InputValue::new("newName", TypeRef::named_nn(TypeRef::STRING)))
                .output_field("name", TypeRef::named(TypeRef::STRING))
                .build(&config),
        ] {
            (mutation, builder) = definition.install(mutation, builder);
        }

        let query = Object::new("Query").field(Field::new(
            "version",
            TypeRef::named_nn(TypeRef::STRING),
            |_| FieldFuture::new(async move { Ok(Some(Value::from("1"))) }),
        ));

        builder.register(query).register(mutation).finish().unwrap()
    }

    async fn run(query: &str) -> serde_json::Value {
        let response = schema().execute(query).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        response.data.into_json().unwrap()
    }

    #[tokio::test]
    async fn test_returns_the_same_client_mutation_id() {
        let data = run(
            r#"mutation M { simpleMutation(input: {clientMutationID: "abc"}) { result clientMutationID } }"#,
        )
        .await;
        assert_eq!(
            data,
            json!({ "simpleMutation": { "result": 1, "clientMutationID": "abc" } })
        );
    }

    #[tokio::test]
    async fn test_supports_async_mutations() {
        let data = run(
            r#"mutation M { simplePromiseMutation(input: {clientMutationID: "abc"}) { result clientMutationID } }"#,
        )
        .await;
        assert_eq!(
            data,
            json!({ "simplePromiseMutation": { "result": 1, "clientMutationID": "abc" } })
        );
    }

    #[tokio::test]
    async fn test_passes_declared_input_fields() {
        let data = run(
            r#"mutation { renameShip(input: {clientMutationID: "r1", newName: "falcon"}) { name clientMutationID } }"#,
        )
        .await;
        assert_eq!(
            data,
            json!({ "renameShip": { "name": "FALCON", "clientMutationID": "r1" } })
        );
    }

    #[tokio::test]
    async fn test_handler_errors_propagate() {
        let response = schema()
            .execute(
                r#"mutation { renameShip(input: {clientMutationID: "r2", newName: ""}) { name } }"#,
            )
            .await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "name must not be empty");
    }

    #[tokio::test]
    async fn test_requires_an_input() {
        let response = schema()
            .execute("mutation M { simpleMutation { result } }")
            .await;
        assert!(!response.errors.is_empty());
    }

    #[tokio::test]
    async fn test_requires_a_client_mutation_id() {
        let response = schema()
            .execute("mutation M { simpleMutation(input: {}) { result } }")
            .await;
        assert!(!response.errors.is_empty());
    }

    #[tokio::test]
    async fn test_introspects_input() {
        let data = run(
            r#"{ __type(name: "SimpleMutationInput") { name kind inputFields { name type { name kind ofType { name kind } } } } }"#,
        )
        .await;
        assert_eq!(
            data,
            json!({ "__type": {
                "name": "SimpleMutationInput",
                "kind": "INPUT_OBJECT",
                "inputFields": [{
                    "name": "clientMutationID",
                    "type": {
                        "name": null,
                        "kind": "NON_NULL",
                        "ofType": { "name": "String", "kind": "SCALAR" }
                    }
                }]
            } })
        );
    }

    #[tokio::test]
    async fn test_introspects_payload() {
        let data = run(
            r#"{ __type(name: "SimpleMutationPayload") { name kind fields { name type { name kind } } } }"#,
        )
        .await;
        assert_eq!(
            data,
            json!({ "__type": {
                "name": "SimpleMutationPayload",
                "kind": "OBJECT",
                "fields": [
                    { "name": "result", "type": { "name": "Int", "kind": "SCALAR" } },
                    { "name": "clientMutationID", "type": { "name": null, "kind": "NON_NULL" } },
                ]
            } })
        );
    }

    #[tokio::test]
    async fn test_introspects_field() {
        let data = run(
            r#"{ __schema { mutationType { fields { name args { name type { kind ofType { name kind } } } type { name kind } } } } }"#,
        )
        .await;
        let fields = &data["__schema"]["mutationType"]["fields"];
        assert_eq!(
            fields[0],
            json!({
                "name": "simpleMutation",
                "args": [{
                    "name": "input",
                    "type": {
                        "kind": "NON_NULL",
                        "ofType": { "name": "SimpleMutationInput", "kind": "INPUT_OBJECT" }
                    }
                }],
                "type": { "name": "SimpleMutationPayload", "kind": "OBJECT" }
            })
        );
        assert_eq!(fields[1]["name"], "simplePromiseMutation");
        assert_eq!(fields[2]["name"], "renameShip");
    }

    #[tokio::test]
    async fn test_custom_client_mutation_id_field() {
        let config = RelayConfig {
            client_mutation_id_field: "clientMutationId".to_string(),
            ..Default::default()
        };
        let definition = MutationConfig::new("Simple", Simple)
            .field_name("doSimple")
            .output_field("result", TypeRef::named(TypeRef::INT))
            .build(&config);
        assert_eq!(definition.input.type_name(), "SimpleInput");
        assert_eq!(definition.payload.type_name(), "SimplePayload");

        let query = Object::new("Query").field(Field::new(
            "version",
            TypeRef::named_nn(TypeRef::STRING),
            |_| FieldFuture::new(async move { Ok(Some(Value::from("1"))) }),
        ));
        let (mutation, builder) = definition.install(
            Object::new("Mutation"),
            Schema::build("Query", Some("Mutation"), None),
        );
        let schema = builder.register(query).register(mutation).finish().unwrap();

        let response = schema
            .execute(r#"mutation { doSimple(input: {clientMutationId: "x1"}) { clientMutationId } }"#)
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({ "doSimple": { "clientMutationId": "x1" } })
        );
    }

    #[test]
    fn test_lower_first() {
        assert_eq!(lower_first("SimpleMutation"), "simpleMutation");
        assert_eq!(lower_first(""), "");
    }
}
