use std::env;

fn main() {
    println!("cargo:rustc-check-cfg=cfg(uio_cdma_has_dmb)");
    println!("cargo:rerun-if-changed=dmb.c");

    let arch = env::var("CARGO_CFG_TARGET_ARCH")
        .expect("Env variable CARGO_CFG_TARGET_ARCH not found");

    if arch != "arm" && arch != "aarch64" {
        // dmb is only available in armv7 and aarch64
        return;
    }

    let mut build = cc::Build::new();
    build.file("dmb.c");
    build.compile("dmb");
    println!("cargo:rustc-cfg=uio_cdma_has_dmb");
}
