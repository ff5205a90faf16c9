use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    /// Digital price.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    /// Physical-variant stock; meaningless while `has_physical_variant` is false.
    pub stock: i32,
    pub has_physical_variant: bool,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub physical_price: Option<Decimal>,
    // Media slots. Any combination may be populated at once; the resolver
    // decides which one is rendered.
    pub image_file: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub image_data: Option<String>,
    pub pdf_file: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub pdf_data: Option<String>,
    pub storage_url: Option<String>,
    pub category_id: Option<i32>,
    /// NULL marks a system/admin product.
    pub user_id: Option<Uuid>,
    /// NULL is treated as public (legacy rows).
    pub is_public: Option<bool>,
    pub hidden: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    Categories,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
