use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub size: String,
    pub color: String,
    #[sea_orm(unique)]
    pub sku: String,
    pub stock: i32,
    pub base_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub length_cm: Option<i32>,
    pub breadth_cm: Option<i32>,
    pub height_cm: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id",
        on_delete = "Cascade"
    )]
    Products,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl crate::catalog_match::VariantAttrs for Model {
    fn size(&self) -> &str {
        &self.size
    }

    fn color(&self) -> &str {
        &self.color
    }
}

impl ActiveModelBehavior for ActiveModel {}
