use vergen_gitcl::{Emitter, Gitcl};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Outside a git checkout vergen emits a placeholder sha instead of failing.
    let gitcl = Gitcl::builder().sha(true).build();

    Emitter::default().add_instructions(&gitcl)?.emit()?;

    println!("cargo:rerun-if-env-changed=SHIPLEDGER_BUILD_ID");

    Ok(())
}
