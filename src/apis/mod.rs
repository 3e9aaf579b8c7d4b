pub mod listing_crawler;
