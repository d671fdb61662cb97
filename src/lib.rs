pub mod admin;
pub mod app;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod dates;
pub mod llm;
pub mod maintenance;
pub mod ocr;
pub mod receipts;
pub mod state;
pub mod storage;
