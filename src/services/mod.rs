pub mod booking_service;
pub mod chat_service;
pub mod email_service;
pub mod export_service;
pub mod gemini_service;
pub mod image_service;
pub mod pricing_service;
pub mod stats_service;
pub mod validation;
