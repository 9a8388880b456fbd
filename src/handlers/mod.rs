// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (teacher JWT) → Elevated (admin teacher JWT)
//
// Handlers only extract and shape HTTP input; the matching service in
// `crate::services` makes every decision.
pub mod multipart;
pub mod elevated; // Tier 3: admin only (/api/app/version writes)
pub mod protected; // Tier 2: JWT authentication required (/api/*)
pub mod public; // Tier 1: No authentication required (/health, /api/auth/*)
