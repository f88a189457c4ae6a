use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // 用户身份
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,  // 显示名称
    pub exp: i64,              // 过期时间
    pub iat: i64,              // 签发时间
}

/// JWT 认证（HS256）
pub struct JwtAuth {
    secret: Option<String>,
    required: bool,
}

impl JwtAuth {
    pub fn new(secret: Option<String>, required: bool) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            required,
        }
    }

    /// 不校验任何令牌
    pub fn disabled() -> Self {
        Self::new(None, false)
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// 签发令牌，供 `ringer --issue-token` 等本地工具使用
    pub fn generate_token(&self, identity: &str, name: Option<&str>, ttl_hours: i64) -> crate::Result<String> {
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| ApiError::InternalError("jwt secret is not configured".to_string()))?;

        let now = Utc::now();
        let claims = Claims {
            sub: identity.to_string(),
            name: name.map(str::to_string),
            exp: (now + Duration::hours(ttl_hours)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| ApiError::InternalError(e.to_string()))
    }

    /// 验证令牌，过期或签名错误都返回 `None`
    pub fn verify_token(&self, token: &str) -> Option<Claims> {
        let secret = self.secret.as_deref()?;
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "Bearer token rejected");
                None
            }
        }
    }
}

/// 认证中间件
///
/// 有效令牌的 claims 注入到请求扩展中；无效令牌按未携带处理，
/// 仅在要求鉴权时返回 401。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(|token| state.auth.verify_token(token.trim()));

    match claims {
        Some(claims) => {
            req.extensions_mut().insert(claims);
        }
        None if state.auth.is_required() => {
            return Err(ApiError::Unauthorized("valid bearer token required".to_string()));
        }
        None => {}
    }

    Ok(next.run(req).await)
}
