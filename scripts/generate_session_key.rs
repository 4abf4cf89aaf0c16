//! Session Key Utility
//!
//! Prints a fresh 256-bit key for the `SESSION_KEY` environment variable.
//! Run with `--check` to validate the key currently in the environment instead.

use tweetapp::crypto::SessionKey;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if std::env::args().any(|arg| arg == "--check") {
        let Ok(existing) = std::env::var("SESSION_KEY") else {
            eprintln!("❌ Error: SESSION_KEY environment variable is not set.");
            std::process::exit(1);
        };
        match SessionKey::from_hex(existing.trim()) {
            Ok(key) => {
                // A key that cannot open its own token is unusable
                let token = key.seal(b"check")?;
                key.open(&token)?;
                println!("✅ SESSION_KEY is a valid 256-bit key.");
            }
            Err(e) => {
                eprintln!("❌ Invalid SESSION_KEY: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let key = SessionKey::generate()?;
    println!("🔐 Session Key Generator");
    println!("========================");
    println!();
    println!("export SESSION_KEY=\"{}\"", key.to_hex());
    println!();
    println!("📝 Sessions issued with one key cannot be opened with another;");
    println!("   rotating the key logs every user out.");
    Ok(())
}
