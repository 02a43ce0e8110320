use clap::CommandFactory;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

fn main() -> io::Result<()> {
    // Generate manpage using clap_mangen
    let cmd = storedash_cli::Args::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buffer: Vec<u8> = Default::default();
    man.render(&mut buffer)?;

    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => return Err(io::Error::new(io::ErrorKind::NotFound, e)),
    };

    fs::write(out_dir.join("storedash.1"), &buffer)?;

    // OUT_DIR is target/<profile>/build/xxx/out; three levels up is target/<profile>/
    if env::var("PROFILE").unwrap_or_default() == "release" {
        if let Some(release_dir) = out_dir.ancestors().nth(3) {
            fs::write(release_dir.join("storedash.1"), &buffer)?;
        }
    }

    println!("cargo:rerun-if-changed=crates/storedash-cli/src/lib.rs");
    Ok(())
}
