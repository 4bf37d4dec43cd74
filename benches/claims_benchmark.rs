use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use zaillisy_auth::services::decode_claims;

fn token(payload: &str) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(r#"{"kid":"abc","alg":"RS256"}"#),
        URL_SAFE_NO_PAD.encode(payload),
        URL_SAFE_NO_PAD.encode([7u8; 256])
    )
}

fn benchmark_decode_claims(c: &mut Criterion) {
    // Shaped like a Cognito ID token
    let cognito = token(
        r#"{"sub":"7f3c1e2a-0000-4000-8000-000000000001","cognito:groups":["sellers"],
        "email_verified":true,"iss":"https://cognito-idp.ap-south-1.amazonaws.com/ap-south-1_example",
        "cognito:username":"ayesha","origin_jti":"0d5d","aud":"3n4b5v6c7x8z9","event_id":"e1",
        "token_use":"id","auth_time":1760000000,"name":"Āyesha Khān","exp":1760003600,
        "iat":1760000000,"jti":"1a2b","email":"ayesha@zaillisy.pk"}"#,
    );
    let minimal = token(r#"{"sub":"u1"}"#);

    let mut group = c.benchmark_group("decode_claims");

    group.bench_function("cognito_id_token", |b| {
        b.iter(|| decode_claims(black_box(&cognito)))
    });

    group.bench_function("minimal_token", |b| {
        b.iter(|| decode_claims(black_box(&minimal)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_decode_claims);
criterion_main!(benches);
