//! Connection, edge and page info types for dynamic schemas
//!
//! Fields returning a connection resolve to
//! `FieldValue::owned_any(Connection<T>)`; the generated edge and connection
//! objects read that parent value back.

use std::any::Any;
use std::marker::PhantomData;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, ObjectAccessor, SchemaBuilder, TypeRef,
};
use async_graphql::Value;

use crate::config::RelayConfig;
use crate::pagination::{Connection, Edge, PageInfo, PaginationInput};

/// `type PageInfo`, shared by every connection in a schema
pub fn page_info_type(config: &RelayConfig) -> Object {
    Object::new(&config.page_info_type)
        .description("Information about pagination in a connection.")
        .field(Field::new(
            "hasNextPage",
            TypeRef::named_nn(TypeRef::BOOLEAN),
            |ctx| {
                FieldFuture::new(async move {
                    let info = ctx.parent_value.try_downcast_ref::<PageInfo>()?;
                    Ok(Some(Value::from(info.has_next_page)))
                })
            },
        ))
        .field(Field::new(
            "hasPreviousPage",
            TypeRef::named_nn(TypeRef::BOOLEAN),
            |ctx| {
                FieldFuture::new(async move {
                    let info = ctx.parent_value.try_downcast_ref::<PageInfo>()?;
                    Ok(Some(Value::from(info.has_previous_page)))
                })
            },
        ))
        .field(Field::new(
            "startCursor",
            TypeRef::named(TypeRef::STRING),
            |ctx| {
                FieldFuture::new(async move {
                    let info = ctx.parent_value.try_downcast_ref::<PageInfo>()?;
                    Ok(info.start_cursor.clone().map(Value::from))
                })
            },
        ))
        .field(Field::new(
            "endCursor",
            TypeRef::named(TypeRef::STRING),
            |ctx| {
                FieldFuture::new(async move {
                    let info = ctx.parent_value.try_downcast_ref::<PageInfo>()?;
                    Ok(info.end_cursor.clone().map(Value::from))
                })
            },
        ))
}

/// Adds `after: String` and `first: Int`
pub fn forward_connection_args(field: Field) -> Field {
    field
        .argument(InputValue::new("after", TypeRef::named(TypeRef::STRING)))
        .argument(InputValue::new("first", TypeRef::named(TypeRef::INT)))
}

/// Adds `before: String` and `last: Int`
pub fn backward_connection_args(field: Field) -> Field {
    field
        .argument(InputValue::new("before", TypeRef::named(TypeRef::STRING)))
        .argument(InputValue::new("last", TypeRef::named(TypeRef::INT)))
}

/// Adds all four connection arguments
pub fn connection_args(field: Field) -> Field {
    backward_connection_args(forward_connection_args(field))
}

impl PaginationInput {
    /// Read connection arguments of a field; explicit nulls count as absent
    pub fn from_args(args: &ObjectAccessor<'_>) -> async_graphql::Result<Self> {
        Ok(Self {
            first: int_arg(args, "first")?,
            after: string_arg(args, "after")?,
            last: int_arg(args, "last")?,
            before: string_arg(args, "before")?,
        })
    }
}

fn int_arg(args: &ObjectAccessor<'_>, name: &str) -> async_graphql::Result<Option<i32>> {
    match args.get(name) {
        Some(value) if !value.is_null() => Ok(Some(i32::try_from(value.i64()?)?)),
        _ => Ok(None),
    }
}

fn string_arg(args: &ObjectAccessor<'_>, name: &str) -> async_graphql::Result<Option<String>> {
    match args.get(name) {
        Some(value) if !value.is_null() => Ok(Some(value.string()?.to_string())),
        _ => Ok(None),
    }
}

/// Edge and connection object types for nodes of type `T`
///
/// For a node type `Ship` this builds
///
/// ```graphql
/// type ShipEdge { node: Ship, cursor: String! }
/// type ShipConnection { edges: [ShipEdge], pageInfo: PageInfo! }
/// ```
pub struct ConnectionDefinitions<T> {
    node_type: String,
    page_info_type: String,
    edge_fields: Vec<Field>,
    connection_fields: Vec<Field>,
    _node: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ConnectionDefinitions<T> {
    pub fn new(node_type: impl Into<String>, config: &RelayConfig) -> Self {
        Self {
            node_type: node_type.into(),
            page_info_type: config.page_info_type.clone(),
            edge_fields: Vec::new(),
            connection_fields: Vec::new(),
            _node: PhantomData,
        }
    }

    pub fn edge_type_name(&self) -> String {
        format!("{}Edge", self.node_type)
    }

    pub fn connection_type_name(&self) -> String {
        format!("{}Connection", self.node_type)
    }

    /// Nullable reference to the connection type, for field definitions
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::named(self.connection_type_name())
    }

    /// Extra field on the edge type; its parent value is `Edge<T>`
    pub fn edge_field(mut self, field: Field) -> Self {
        self.edge_fields.push(field);
        self
    }

    /// Extra field on the connection type (e.g. `totalCount`); its parent
    /// value is `Connection<T>`
    pub fn connection_field(mut self, field: Field) -> Self {
        self.connection_fields.push(field);
        self
    }

    /// Build the edge and connection object types
    pub fn into_types(self) -> (Object, Object) {
        let edge_name = self.edge_type_name();
        let connection_name = self.connection_type_name();

        let mut edge = Object::new(&edge_name)
            .description("An edge in a connection.")
            .field(
                Field::new("node", TypeRef::named(&self.node_type), |ctx| {
                    FieldFuture::new(async move {
                        let edge = ctx.parent_value.try_downcast_ref::<Edge<T>>()?;
                        Ok(Some(FieldValue::borrowed_any(&edge.node)))
                    })
                })
                .description("The item at the end of the edge"),
            )
            .field(
                Field::new("cursor", TypeRef::named_nn(TypeRef::STRING), |ctx| {
                    FieldFuture::new(async move {
                        let edge = ctx.parent_value.try_downcast_ref::<Edge<T>>()?;
                        Ok(Some(Value::from(edge.cursor.clone())))
                    })
                })
                .description("A cursor for use in pagination"),
            );
        for field in self.edge_fields {
            edge = edge.field(field);
        }

        let mut connection = Object::new(connection_name)
            .description("A connection to a list of items.")
            .field(
                Field::new("edges", TypeRef::named_list(&edge_name), |ctx| {
                    FieldFuture::new(async move {
                        let connection = ctx.parent_value.try_downcast_ref::<Connection<T>>()?;
                        Ok(Some(FieldValue::list(
                            connection
                                .edges
                                .iter()
                                .map(|edge| FieldValue::borrowed_any(edge)),
                        )))
                    })
                })
                .description("A list of edges."),
            )
            .field(
                Field::new(
                    "pageInfo",
                    TypeRef::named_nn(&self.page_info_type),
                    |ctx| {
                        FieldFuture::new(async move {
                            let connection =
                                ctx.parent_value.try_downcast_ref::<Connection<T>>()?;
                            Ok(Some(FieldValue::borrowed_any(&connection.page_info)))
                        })
                    },
                )
                .description("Information to aid in pagination."),
            );
        for field in self.connection_fields {
            connection = connection.field(field);
        }

        (edge, connection)
    }

    /// Add the edge and connection types to a schema
    ///
    /// The page info type is shared and registered separately with
    /// [`page_info_type`].
    pub fn register(self, builder: SchemaBuilder) -> SchemaBuilder {
        let (edge, connection) = self.into_types();
        builder.register(edge).register(connection)
    }
}
