/// OpenAPI documentation generation.
pub mod documentation;
/// Builders and fan-out for events pushed to room clients.
pub mod events;
/// Health check service.
pub mod health_service;
/// Reconciliation of stored participants against live connections.
pub mod presence;
/// Room aggregate manager: timer, roster, chat, todos, activity log.
pub mod room_service;
/// WebSocket command gateway.
pub mod socket_service;
/// Storage persistence supervisor with reconnect and degraded mode.
pub mod storage_supervisor;
