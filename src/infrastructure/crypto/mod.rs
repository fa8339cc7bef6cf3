pub mod jwt;
pub mod signature;

pub use jwt::{create_token, verify_token, AuthError, JwtConfig, TokenClaims};
pub use signature::{SignatureError, WebhookVerifier, SIGNATURE_HEADER};
