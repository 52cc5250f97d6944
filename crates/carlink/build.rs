// Build provenance for `carlink version --extended`.
const EXPORTS: [(&str, &str); 2] = [
    ("TARGET", "CARLINK_BUILD_TARGET"),
    ("PROFILE", "CARLINK_BUILD_PROFILE"),
];

fn main() {
    for (var, exported) in EXPORTS {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={exported}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }
    println!("cargo:rerun-if-changed=build.rs");
}
