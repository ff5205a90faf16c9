use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        categories::{CategoryList, CategoryTree, CategoryTreeNode},
        checkout::{CheckoutSessionResponse, CreateCheckoutSessionRequest, WebhookAck},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products as product_dto,
    },
    models::{Category, MediaRef, Order, OrderItem, Product, User},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, categories, checkout, health, orders, params, products as product_routes,
        proxy,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        product_routes::delete_storage_slot,
        product_routes::serve_image,
        product_routes::serve_pdf,
        product_routes::download_image,
        categories::list_categories,
        categories::category_tree,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        proxy::proxy_image,
        proxy::proxy_pdf,
        checkout::create_checkout_session,
        checkout::webhook,
        orders::list_orders,
        orders::get_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
    ),
    components(
        schemas(
            User,
            Product,
            MediaRef,
            Category,
            Order,
            OrderItem,
            product_dto::CreateProductRequest,
            product_dto::UpdateProductRequest,
            product_dto::ProductList,
            CategoryList,
            CategoryTree,
            CategoryTreeNode,
            CreateCheckoutSessionRequest,
            CheckoutSessionResponse,
            WebhookAck,
            OrderList,
            OrderWithItems,
            UpdateOrderStatusRequest,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<product_dto::ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CategoryList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Product catalog and media slots"),
        (name = "Categories", description = "Category CRUD and navigation tree"),
        (name = "Proxy", description = "CORS-bypass fetch of external media"),
        (name = "Checkout", description = "Stripe checkout and webhook"),
        (name = "Orders", description = "Order history"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
