/// Stamp the binary with the checkout it was built from (GIT_HASH).
fn main() {
    let described = std::process::Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok());
    let hash = described.as_deref().map(str::trim).unwrap_or("unknown");
    println!("cargo:rustc-env=GIT_HASH={}", hash);

    println!("cargo:rerun-if-changed=.git/HEAD");
    let head = std::fs::read_to_string(".git/HEAD").unwrap_or_default();
    if let Some(refpath) = head.strip_prefix("ref: ") {
        println!("cargo:rerun-if-changed=.git/{}", refpath.trim());
    }
}
