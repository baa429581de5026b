const DOCKERFILE: &str = include_str!("../Dockerfile");

fn version_parts(v: &str) -> Vec<u32> {
    v.split('.').filter_map(|p| p.parse().ok()).collect()
}

#[test]
fn test_builder_toolchain_meets_rust_version() {
    let from = DOCKERFILE
        .lines()
        .find(|l| l.starts_with("FROM rust:"))
        .expect("build stage uses a rust image");
    let tag = from
        .trim_start_matches("FROM rust:")
        .split('-')
        .next()
        .unwrap();

    let required = version_parts(env!("CARGO_PKG_RUST_VERSION"));
    assert!(!required.is_empty(), "Cargo.toml should declare rust-version");
    assert!(version_parts(tag) >= required, "builder {tag} is older than rust-version");
}

#[test]
fn test_image_has_tls_and_timezone_packages() {
    assert!(DOCKERFILE.contains("pkg-config libssl-dev"));
    assert!(DOCKERFILE.contains("libssl3"));
    assert!(DOCKERFILE.contains("tzdata"));
    assert!(DOCKERFILE.contains("WORKDIR /app"));
    assert!(DOCKERFILE.contains("ENV TZ=Asia/Tokyo"));
}
