use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::services::auth::{
    AuthPayload, AuthService, EmailRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, VerifyOtpRequest,
};

/// POST /api/auth/register - Create a teacher account and sign in
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<AuthPayload> {
    let payload = AuthService::new(&state).register(request).await?;
    Ok(ApiResponse::created(payload).message("Teacher registered successfully"))
}

/// POST /api/auth/login - Exchange email and password for a JWT
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<AuthPayload> {
    let payload = AuthService::new(&state).login(request).await?;
    Ok(ApiResponse::success(payload).message("Login successful"))
}

/// POST /api/auth/forgot-password - Email a one-time code
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<EmailRequest>,
) -> ApiResult<()> {
    AuthService::new(&state).forgot_password(&request.email).await?;
    Ok(ApiResponse::success(()).message("OTP sent to your email"))
}

/// POST /api/auth/resend-otp - Same as forgot-password, with a fresh code
pub async fn resend_otp(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<EmailRequest>,
) -> ApiResult<()> {
    AuthService::new(&state).forgot_password(&request.email).await?;
    Ok(ApiResponse::success(()).message("OTP resent to your email"))
}

/// POST /api/auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<VerifyOtpRequest>,
) -> ApiResult<()> {
    AuthService::new(&state).verify_otp(&request).await?;
    Ok(ApiResponse::success(()).message("OTP verified successfully"))
}

/// POST /api/auth/reset-password - Set a new password with a valid code
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<()> {
    AuthService::new(&state).reset_password(request).await?;
    Ok(ApiResponse::success(()).message("Password reset successfully"))
}
