pub mod dispatcher;
pub mod health_service;
pub mod messaging_service;
pub mod rate_limit_service;
