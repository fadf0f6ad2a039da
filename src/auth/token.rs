//! HS256 JWT encoding and verification

use jsonwebtoken::{
    errors::{Error as JwtError, ErrorKind},
    Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::{AuthError, SigningSecret, TokenClaims};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Serialize and sign `claims`
pub fn encode(claims: &TokenClaims, secret: &SigningSecret) -> Result<String, AuthError> {
    jsonwebtoken::encode(
        &Header::new(ALGORITHM),
        claims,
        &EncodingKey::from_secret(secret.expose()),
    )
    .map_err(|e| AuthError::TokenIssue(e.to_string()))
}

/// Decode the claims without checking the signature or expiry.
///
/// The header must still name HS256.
pub fn decode_unverified(token: &str) -> Result<TokenClaims, AuthError> {
    let header = jsonwebtoken::decode_header(token).map_err(|_| AuthError::Malformed)?;
    if header.alg != ALGORITHM {
        return Err(AuthError::Malformed);
    }

    let mut validation = Validation::new(ALGORITHM);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;

    jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|_| AuthError::Malformed)
}

/// Decode the claims and check the signature against `secret`. Expiry is
/// left to the caller.
pub fn decode_verified(token: &str, secret: &SigningSecret) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.validate_exp = false;

    jsonwebtoken::decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.expose()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(verification_error)
}

fn verification_error(err: JwtError) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::Malformed,
    }
}
