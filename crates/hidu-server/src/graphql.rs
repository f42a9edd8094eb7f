use async_graphql::{
    Context, EmptySubscription, Error, ErrorExtensions, Object, Result, SDLExportOptions, Schema,
};
use hidu::services::{
    CreateMenuItemInput, MenuFilters, MenuItem, MenuService, ServiceError, UpdateMenuItemInput,
};
use hidu::validation::Validator;
use std::sync::Arc;

pub type MenuSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with its dependencies attached as schema data
pub fn build_schema(service: Arc<MenuService>, validator: Validator) -> MenuSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .data(validator)
        .finish()
}

/// Schema definition language for the API, with fields and arguments sorted
/// so the output is stable across builds
pub fn sdl() -> String {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .finish()
        .sdl_with_options(SDLExportOptions::new().sorted_fields().sorted_arguments())
}

/// Machine-readable `extensions.code` for a service error
pub fn error_code(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::Validation(_) => "BAD_REQUEST",
        ServiceError::NotFound(_) => "NOT_FOUND",
        ServiceError::Conflict(_) => "CONFLICT",
        ServiceError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        ServiceError::Internal(_) => "INTERNAL_SERVER_ERROR",
    }
}

fn graphql_error(err: ServiceError) -> Error {
    let code = error_code(&err);
    let message = match &err {
        ServiceError::Internal(e) => {
            tracing::error!("Internal error: {:#}", e);
            "Internal server error".to_string()
        },
        ServiceError::StoreUnavailable(reason) => {
            tracing::warn!("Store unavailable: {}", reason);
            err.to_string()
        },
        _ => err.to_string(),
    };

    let violations = match &err {
        ServiceError::Validation(errors) => serde_json::to_value(&errors.violations)
            .ok()
            .and_then(|v| async_graphql::Value::from_json(v).ok()),
        _ => None,
    };

    Error::new(message).extend_with(|_, e| {
        e.set("code", code);
        if let Some(violations) = violations {
            e.set("violations", violations);
        }
    })
}

fn menu_service<'a>(ctx: &Context<'a>) -> Result<&'a Arc<MenuService>> {
    ctx.data::<Arc<MenuService>>()
}

fn validator<'a>(ctx: &Context<'a>) -> Result<&'a Validator> {
    ctx.data::<Validator>()
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Menu items, optionally filtered by category and availability
    async fn menu_items(
        &self,
        ctx: &Context<'_>,
        category: Option<String>,
        is_available: Option<bool>,
    ) -> Result<Vec<MenuItem>> {
        menu_service(ctx)?
            .list_items(MenuFilters {
                category,
                is_available,
            })
            .await
            .map_err(graphql_error)
    }

    /// A single item by business id, null when absent
    async fn menu_item(&self, ctx: &Context<'_>, id: String) -> Result<Option<MenuItem>> {
        menu_service(ctx)?
            .find_item(&id)
            .await
            .map_err(graphql_error)
    }

    /// Distinct categories across all items
    async fn categories(&self, ctx: &Context<'_>) -> Result<Vec<String>> {
        menu_service(ctx)?
            .list_categories()
            .await
            .map_err(graphql_error)
    }

    async fn health(&self) -> &'static str {
        "ok"
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_menu_item(
        &self,
        ctx: &Context<'_>,
        input: CreateMenuItemInput,
    ) -> Result<MenuItem> {
        validator(ctx)?
            .validate_create(&input)
            .map_err(|e| graphql_error(e.into()))?;
        menu_service(ctx)?
            .create_item(input)
            .await
            .map_err(graphql_error)
    }

    async fn update_menu_item(
        &self,
        ctx: &Context<'_>,
        id: String,
        input: UpdateMenuItemInput,
    ) -> Result<MenuItem> {
        validator(ctx)?
            .validate_update(&input)
            .map_err(|e| graphql_error(e.into()))?;
        menu_service(ctx)?
            .update_item(&id, input)
            .await
            .map_err(graphql_error)
    }

    async fn delete_menu_item(&self, ctx: &Context<'_>, id: String) -> Result<bool> {
        menu_service(ctx)?
            .delete_item(&id)
            .await
            .map_err(graphql_error)
    }

    async fn toggle_menu_item_availability(
        &self,
        ctx: &Context<'_>,
        id: String,
    ) -> Result<MenuItem> {
        menu_service(ctx)?
            .toggle_availability(&id)
            .await
            .map_err(graphql_error)
    }
}
