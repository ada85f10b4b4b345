//! Global object identification
//!
//! Every refetchable object exposes an opaque `id` that encodes its kind and
//! local id. The [`NodeRegistry`] maps kinds to fetchers and classifies
//! fetched instances so the `node` root field can return them through the
//! `Node` interface.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Interface, InterfaceField, SchemaBuilder, TypeRef,
};
use async_graphql::{Context, ErrorExtensions, Value};
use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::codec::{to_global_id, GlobalId};
use crate::config::{is_graphql_name, RelayConfig};
use crate::RelayError;

/// Instance returned by a fetcher; object resolvers downcast it back
pub type NodeInstance = Box<dyn Any + Send + Sync>;

/// Loads the instance of one kind for a local id
///
/// Returning `Ok(None)` makes the object look like it does not exist.
/// Errors surface as request errors.
#[async_trait]
pub trait NodeFetcher: Send + Sync {
    async fn fetch(
        &self,
        local_id: &str,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Option<NodeInstance>>;
}

/// Fetcher backed by a synchronous closure
pub struct FetchFn<F>(F);

/// Wrap a closure as a [`NodeFetcher`]
pub fn fetch_fn<F>(f: F) -> FetchFn<F>
where
    F: Fn(&str, &Context<'_>) -> Option<NodeInstance> + Send + Sync,
{
    FetchFn(f)
}

#[async_trait]
impl<F> NodeFetcher for FetchFn<F>
where
    F: Fn(&str, &Context<'_>) -> Option<NodeInstance> + Send + Sync,
{
    async fn fetch(
        &self,
        local_id: &str,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Option<NodeInstance>> {
        Ok((self.0)(local_id, ctx))
    }
}

/// Classifies an instance of unknown kind
///
/// Must recognise everything any registered fetcher can return; `None` is a
/// configuration error.
pub trait TypeResolver: Send + Sync {
    fn resolve_kind(
        &self,
        instance: &(dyn Any + Send + Sync),
        ctx: &Context<'_>,
    ) -> Option<String>;
}

/// Type resolver keyed by the concrete Rust type of the instance
#[derive(Debug, Default, Clone)]
pub struct KindMap {
    kinds: HashMap<TypeId, String>,
}

impl KindMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances of `T` resolve to `kind`
    pub fn bind<T: Any>(mut self, kind: impl Into<String>) -> Self {
        self.kinds.insert(TypeId::of::<T>(), kind.into());
        self
    }
}

impl TypeResolver for KindMap {
    fn resolve_kind(
        &self,
        instance: &(dyn Any + Send + Sync),
        _ctx: &Context<'_>,
    ) -> Option<String> {
        self.kinds.get(&instance.type_id()).cloned()
    }
}

/// Kind to fetcher table plus the global type resolver
///
/// Populated during schema setup and read-only afterwards.
pub struct NodeRegistry {
    fetchers: HashMap<String, Arc<dyn NodeFetcher>>,
    type_resolver: Arc<dyn TypeResolver>,
}

impl NodeRegistry {
    pub fn new(type_resolver: impl TypeResolver + 'static) -> Self {
        Self {
            fetchers: HashMap::new(),
            type_resolver: Arc::new(type_resolver),
        }
    }

    /// Register the fetcher for a kind
    ///
    /// Kinds are unique: registering a kind twice is rejected rather than
    /// overwriting the first fetcher.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        fetcher: impl NodeFetcher + 'static,
    ) -> crate::Result<()> {
        let kind = kind.into();
        if !is_graphql_name(&kind) {
            return Err(RelayError::InvalidKind(kind));
        }
        if self.fetchers.contains_key(&kind) {
            error!(kind = %kind, "Node kind registered twice");
            return Err(RelayError::DuplicateKind(kind));
        }

        info!(kind = %kind, "Registering node kind");
        self.fetchers.insert(kind, Arc::new(fetcher));
        Ok(())
    }

    /// Builder form of [`NodeRegistry::register`]
    pub fn with_kind(
        mut self,
        kind: impl Into<String>,
        fetcher: impl NodeFetcher + 'static,
    ) -> crate::Result<Self> {
        self.register(kind, fetcher)?;
        Ok(self)
    }

    pub fn contains_kind(&self, kind: &str) -> bool {
        self.fetchers.contains_key(kind)
    }

    /// Registered kinds, in no particular order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.fetchers.keys().map(String::as_str)
    }

    /// Fetch the instance a global id points at
    ///
    /// Undecodable ids and unregistered kinds are `Ok(None)`, exactly like an
    /// object that does not exist.
    pub async fn lookup(
        &self,
        token: &str,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Option<NodeInstance>> {
        Ok(self
            .lookup_with_kind(token, ctx)
            .await?
            .map(|(_, instance)| instance))
    }

    /// Runtime kind of an instance, as the type resolver classifies it
    pub fn resolve_kind(
        &self,
        instance: &(dyn Any + Send + Sync),
        ctx: &Context<'_>,
    ) -> crate::Result<String> {
        self.type_resolver
            .resolve_kind(instance, ctx)
            .ok_or_else(|| RelayError::UnresolvedType(format!("{:?}", instance.type_id())))
    }

    /// Look up a global id and tag the result with its runtime kind
    pub async fn node<'a>(
        &self,
        token: &str,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Option<FieldValue<'a>>> {
        let Some((fetched_as, instance)) = self.lookup_with_kind(token, ctx).await? else {
            return Ok(None);
        };

        let kind = self.resolve_kind(&*instance, ctx).map_err(|e| {
            error!(
                kind = %fetched_as,
                "Fetched node cannot be classified by the type resolver"
            );
            e.extend()
        })?;

        Ok(Some(FieldValue::boxed_any(instance).with_type(kind)))
    }

    async fn lookup_with_kind(
        &self,
        token: &str,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Option<(String, NodeInstance)>> {
        let global_id = match GlobalId::decode(token) {
            Ok(global_id) => global_id,
            Err(e) => {
                debug!(token, error = %e, "Node lookup with undecodable id");
                return Ok(None);
            }
        };

        let Some(fetcher) = self.fetchers.get(global_id.kind()) else {
            debug!(kind = %global_id.kind(), "Node lookup for unregistered kind");
            return Ok(None);
        };

        let instance = fetcher.fetch(global_id.id(), ctx).await?;
        Ok(instance.map(|instance| (global_id.kind().to_string(), instance)))
    }
}

/// The `Node` interface and the `node` root field that refetches through it
pub struct NodeDefinitions {
    registry: Arc<NodeRegistry>,
    interface_name: String,
}

impl NodeDefinitions {
    pub fn new(registry: Arc<NodeRegistry>, config: &RelayConfig) -> Self {
        Self {
            registry,
            interface_name: config.node_interface.clone(),
        }
    }

    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// `interface Node { id: ID! }`
    pub fn node_interface(&self) -> Interface {
        Interface::new(&self.interface_name)
            .description("An object with an ID")
            .field(
                InterfaceField::new("id", TypeRef::named_nn(TypeRef::ID))
                    .description("The id of the object."),
            )
    }

    /// `node(id: ID!): Node`
    pub fn node_field(&self) -> Field {
        let registry = self.registry.clone();
        Field::new("node", TypeRef::named(&self.interface_name), move |ctx| {
            let registry = registry.clone();
            FieldFuture::new(async move {
                let id = ctx.args.try_get("id")?;
                let token = id.string()?;
                registry.node(token, ctx.ctx).await
            })
        })
        .description("Fetches an object given its ID")
        .argument(
            InputValue::new("id", TypeRef::named_nn(TypeRef::ID))
                .description("The ID of an object"),
        )
    }

    /// Add the `Node` interface to a schema
    pub fn register(&self, builder: SchemaBuilder) -> SchemaBuilder {
        builder.register(self.node_interface())
    }
}

/// `id: ID!` field for an object type whose instances are `T`
///
/// `local_id_of` reads the id of an instance within `kind`. The kind must be
/// a GraphQL name, checked here so the field never fails at request time.
pub fn global_id_field<T, F>(kind: &str, local_id_of: F) -> crate::Result<Field>
where
    T: Any + Send + Sync,
    F: Fn(&T) -> String + Send + Sync + 'static,
{
    if !is_graphql_name(kind) {
        return Err(RelayError::InvalidKind(kind.to_string()));
    }

    let kind = kind.to_string();
    let field = Field::new("id", TypeRef::named_nn(TypeRef::ID), move |ctx| {
        let token = ctx
            .parent_value
            .try_downcast_ref::<T>()
            .and_then(|instance| {
                to_global_id(&kind, &local_id_of(instance)).map_err(|e| e.extend())
            });
        FieldFuture::new(async move { Ok(Some(Value::from(token?))) })
    })
    .description("The ID of an object");
    Ok(field)
}
