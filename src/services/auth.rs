use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::auth::{self, check_password_strength, generate_otp, hash_password, verify_password};
use crate::database::models::Teacher;
use crate::email::Email;
use crate::error::ApiError;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub teacher: Teacher,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AuthService<'a> {
    state: &'a AppState,
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn issue(&self, teacher: Teacher) -> Result<AuthPayload, ApiError> {
        let security = &self.state.config.security;
        let token = auth::issue_token(teacher.id, &security.jwt_secret, security.jwt_expiry_hours)?;
        Ok(AuthPayload { token, teacher })
    }

    async fn hash(&self, password: String) -> Result<String, ApiError> {
        let cost = self.state.config.security.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| ApiError::internal("Password hashing task failed", e))?
            .map_err(ApiError::from)
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthPayload, ApiError> {
        let email = normalize_email(&request.email);
        check_password_strength(&request.password)?;

        if self.state.store.find_teacher_by_email(&email).await?.is_some() {
            return Err(ApiError::duplicate("DUPLICATE_EMAIL", "Teacher with this email already exists"));
        }

        let hash = self.hash(request.password).await?;
        let teacher = Teacher::new(request.name.trim().to_string(), email, hash);
        self.state.store.insert_teacher(&teacher).await?;

        info!("Registered teacher {}", teacher.id);
        self.issue(teacher)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthPayload, ApiError> {
        let email = normalize_email(&request.email);
        let teacher = self.state.store.find_teacher_by_email(&email).await?;

        let mut teacher = match teacher {
            Some(t) if t.is_active && verify_password(&request.password, &t.password_hash) => t,
            _ => return Err(ApiError::unauthorized("Invalid credentials")),
        };

        let now = Utc::now();
        teacher.last_login = Some(now);
        teacher.updated_at = now;
        self.state.store.update_teacher(&teacher).await?;

        self.issue(teacher)
    }

    /// Resolve a bearer token to an active teacher
    pub async fn authenticate(&self, token: &str) -> Result<Teacher, ApiError> {
        let claims = auth::validate_jwt(token, &self.state.config.security.jwt_secret)?;
        match self.state.store.find_teacher_by_id(claims.sub).await? {
            Some(teacher) if teacher.is_active => Ok(teacher),
            _ => Err(ApiError::unauthorized("Token is not valid")),
        }
    }

    /// Store a fresh OTP on the account and mail it. Also serves OTP resends.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let email = normalize_email(email);
        let mut teacher = self
            .state
            .store
            .find_teacher_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::not_found("No account found with this email"))?;

        let ttl = self.state.config.security.otp_ttl_minutes;
        let otp = generate_otp();
        let now = Utc::now();
        teacher.otp = Some(otp.clone());
        teacher.otp_expiry = Some(now + Duration::minutes(ttl));
        teacher.updated_at = now;
        self.state.store.update_teacher(&teacher).await?;

        let message = Email::password_reset(&teacher.email, &teacher.name, &otp, ttl);
        self.state.mailer.send(&message).await?;
        info!("Password reset code issued for teacher {}", teacher.id);
        Ok(())
    }

    async fn teacher_with_valid_otp(&self, email: &str, otp: &str) -> Result<Teacher, ApiError> {
        let email = normalize_email(email);
        match self.state.store.find_teacher_by_email(&email).await? {
            Some(teacher) if teacher.otp_matches(otp.trim(), Utc::now()) => Ok(teacher),
            _ => Err(ApiError::bad_request("Invalid or expired OTP")),
        }
    }

    pub async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<(), ApiError> {
        self.teacher_with_valid_otp(&request.email, &request.otp).await.map(|_| ())
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), ApiError> {
        let mut teacher = self.teacher_with_valid_otp(&request.email, &request.otp).await?;
        check_password_strength(&request.new_password)?;

        teacher.password_hash = self.hash(request.new_password).await?;
        teacher.otp = None;
        teacher.otp_expiry = None;
        teacher.updated_at = Utc::now();
        self.state.store.update_teacher(&teacher).await?;

        info!("Password reset for teacher {}", teacher.id);
        Ok(())
    }

    pub async fn change_password(&self, teacher: &Teacher, request: ChangePasswordRequest) -> Result<(), ApiError> {
        if !verify_password(&request.current_password, &teacher.password_hash) {
            return Err(ApiError::bad_request("Current password is incorrect"));
        }
        check_password_strength(&request.new_password)?;

        let mut teacher = teacher.clone();
        teacher.password_hash = self.hash(request.new_password).await?;
        teacher.updated_at = Utc::now();
        self.state.store.update_teacher(&teacher).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Asha Patil".into(),
            email: email.into(),
            password: "Passw0rd!".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let ctx = TestContext::new();
        let service = AuthService::new(&ctx.state);

        let registered = service.register(register_request(" Asha@School.in ")).await.unwrap();
        assert_eq!(registered.teacher.email, "asha@school.in");
        assert!(!registered.token.is_empty());

        let logged_in = service
            .login(LoginRequest {
                email: "asha@school.in".into(),
                password: "Passw0rd!".into(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.teacher.id, registered.teacher.id);
        assert!(logged_in.teacher.last_login.is_some());

        let me = service.authenticate(&logged_in.token).await.unwrap();
        assert_eq!(me.id, registered.teacher.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let ctx = TestContext::new();
        let service = AuthService::new(&ctx.state);
        service.register(register_request("asha@school.in")).await.unwrap();

        let err = service.register(register_request("ASHA@school.in")).await.unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_EMAIL");
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn bad_credentials_look_the_same() {
        let ctx = TestContext::new();
        let service = AuthService::new(&ctx.state);
        service.register(register_request("asha@school.in")).await.unwrap();

        for (email, password) in [("asha@school.in", "Wrong0rd!"), ("nobody@school.in", "Passw0rd!")] {
            let err = service
                .login(LoginRequest {
                    email: email.into(),
                    password: password.into(),
                })
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 401);
            assert_eq!(err.message(), "Invalid credentials");
        }
    }

    #[tokio::test]
    async fn weak_password_is_a_validation_error() {
        let ctx = TestContext::new();
        let mut request = register_request("asha@school.in");
        request.password = "password".into();

        let err = AuthService::new(&ctx.state).register(request).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn otp_reset_flow() {
        let ctx = TestContext::new();
        let service = AuthService::new(&ctx.state);
        service.register(register_request("asha@school.in")).await.unwrap();

        service.forgot_password("asha@school.in").await.unwrap();
        let otp = ctx.mailer.last_otp().expect("otp mailed");

        let wrong = VerifyOtpRequest {
            email: "asha@school.in".into(),
            otp: "000000".into(),
        };
        assert_eq!(service.verify_otp(&wrong).await.unwrap_err().message(), "Invalid or expired OTP");

        service
            .reset_password(ResetPasswordRequest {
                email: "asha@school.in".into(),
                otp: otp.clone(),
                new_password: "N3wPassw0rd!".into(),
            })
            .await
            .unwrap();

        // The code is single use
        let reused = VerifyOtpRequest {
            email: "asha@school.in".into(),
            otp,
        };
        assert!(service.verify_otp(&reused).await.is_err());

        service
            .login(LoginRequest {
                email: "asha@school.in".into(),
                password: "N3wPassw0rd!".into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_email_reset_is_not_found() {
        let ctx = TestContext::new();
        let err = AuthService::new(&ctx.state).forgot_password("ghost@school.in").await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn change_password_checks_current() {
        let ctx = TestContext::new();
        let service = AuthService::new(&ctx.state);
        let teacher = service.register(register_request("asha@school.in")).await.unwrap().teacher;

        let err = service
            .change_password(
                &teacher,
                ChangePasswordRequest {
                    current_password: "Nope0000!".into(),
                    new_password: "N3wPassw0rd!".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Current password is incorrect");

        service
            .change_password(
                &teacher,
                ChangePasswordRequest {
                    current_password: "Passw0rd!".into(),
                    new_password: "N3wPassw0rd!".into(),
                },
            )
            .await
            .unwrap();
    }
}
