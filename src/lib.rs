pub mod api_connection;
pub mod cli;
pub mod ingredient_aggregator;
pub mod menu_planner;
pub mod offline;
pub mod price_resolver;
pub mod product_catalog;
pub mod response_parser;
pub mod shopping_tracker;
pub mod storage;
