use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::ExtractError;

/// Downloads `url` to `dest` unless the file is already there. Returns
/// whether anything was fetched.
pub fn download(url: &str, dest: &Path) -> Result<bool, ExtractError> {
    if dest.exists() {
        info!("Already have {:?}, skipping", dest);
        return Ok(false);
    }
    if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| ExtractError::io(dir, e))?;
    }

    info!("Fetching {}", url);
    let download_err = |source| ExtractError::Download {
        url: url.to_string(),
        source,
    };
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;

    // Partial transfers never sit at `dest`.
    let mut partial = dest.as_os_str().to_owned();
    partial.push(".part");
    let mut file = fs::File::create(&partial).map_err(|e| ExtractError::io(&partial, e))?;
    let bytes = match response.copy_to(&mut file) {
        Ok(bytes) => bytes,
        Err(source) => {
            drop(file);
            if let Err(e) = fs::remove_file(&partial) {
                warn!("Could not remove {:?}: {}", partial, e);
            }
            return Err(download_err(source));
        }
    };
    fs::rename(&partial, dest).map_err(|e| ExtractError::io(dest, e))?;

    info!("Saved {} bytes to {:?}", bytes, dest);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_file_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("en_FH.pdf");
        fs::write(&dest, b"%PDF").unwrap();
        // Unroutable URL: a request would fail.
        assert!(!download("http://127.0.0.1:9/en_FH.pdf", &dest).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"%PDF");
    }

    #[test]
    fn truncated_body_leaves_no_partial_file() {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n%PDF-1.4 short")
                .unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("en_FH.pdf");
        let err = download(&format!("http://{}/en_FH.pdf", addr), &dest).unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, ExtractError::Download { .. }));
        assert!(!dest.exists());
        assert!(!dir.path().join("en_FH.pdf.part").exists());
    }

    #[test]
    fn failed_request_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("pdf").join("en_FH.pdf");
        let err = download("http://127.0.0.1:9/en_FH.pdf", &dest).unwrap_err();
        assert!(matches!(err, ExtractError::Download { .. }));
        assert!(!dest.exists());
    }
}
