fn main() {
    let mut build = cc::Build::new();

    build
        .file("c/lib.c")
        .include("c")
        .flag("-O3")
        .flag("-std=c99") // Enforce C99 standard
        .warnings(false);

    build.compile("nstrided");

    println!("cargo:rerun-if-changed=c/lib.c");
    println!("cargo:rerun-if-changed=c/nstrided.h");
    println!("cargo:rerun-if-changed=rust/backend.rs");
}
