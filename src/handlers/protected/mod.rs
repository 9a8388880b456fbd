// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route here runs behind `jwt_auth_middleware`, which puts the active
// teacher in the request extensions. Handlers pass `teacher.id` down so each
// service query stays scoped to the caller's own records.
pub mod auth;
pub mod divisions;
pub mod lesson_plans;
pub mod mcq;
pub mod mcq_student;
pub mod profile;
pub mod standards;
pub mod students;
pub mod uploads;
