//! 将 `memory.x` 复制到链接器可以找到的目录
//!
//! 仅在交叉编译到 Cortex-M 目标时生效，主机上的单元测试不受影响。

use std::{env, fs, io, path::PathBuf};

fn main() -> io::Result<()> {
    let target = env::var("TARGET").unwrap_or_default();
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    if !target.starts_with("thumbv7m") {
        return Ok(());
    }

    let out = PathBuf::from(env::var_os("OUT_DIR").unwrap_or_default());
    fs::write(out.join("memory.x"), include_bytes!("memory.x"))?;
    println!("cargo:rustc-link-search={}", out.display());
    Ok(())
}
