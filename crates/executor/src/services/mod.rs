pub mod execution_service;
pub mod notifier;
pub mod pipeline_service;
pub mod symbol_guard;
pub mod telegram_service;
