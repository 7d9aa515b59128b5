pub mod goods_in_shops;
pub mod retry_pipeline;
