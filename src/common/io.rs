//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use flate2::{bufread::MultiGzDecoder, write::GzEncoder, Compression};
use sha2::{Digest, Sha256};

/// Transparently open a file with gzip decoder.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let file = File::open(path)?;
        let bufreader = BufReader::new(file);
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        let file = File::open(path).map(BufReader::new)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Transparently open a file with gzip encoder.
pub fn open_write_maybe_gz<P>(path: P) -> Result<Box<dyn Write>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for writing", path.as_ref());
        let file = File::create(path)?;
        let bufwriter = BufWriter::new(file);
        let encoder = GzEncoder::new(bufwriter, Compression::default());
        Ok(Box::new(encoder))
    } else {
        tracing::trace!("Opening {:?} as plain text for writing", path.as_ref());
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Compute SHA256 checksum of the file at `path`.
pub fn sha256sum<P>(path: P) -> Result<String, anyhow::Error>
where
    P: AsRef<Path> + std::fmt::Debug,
{
    tracing::debug!("Computing SHA256 checksum for {:?}", &path);

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let _n = std::io::copy(&mut file, &mut hasher)?;
    let hash = hasher.finalize();
    let mut buf = [0u8; 64];
    let checksum = base16ct::lower::encode_str(&hash, &mut buf)
        .map_err(|e| anyhow::anyhow!("problem encoding checksum: {}", e))?;
    tracing::debug!(" SHA256 = {}", &checksum);
    Ok(checksum.to_owned())
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};

    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case("test.txt")]
    #[case("test.txt.gz")]
    fn open_write_then_read_maybe_gz(#[case] filename: &str) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join(filename);

        {
            let mut f = super::open_write_maybe_gz(&path)?;
            f.write_all(b"rsid\tgenotype\nrs1234\tAG\n")?;
        }

        let mut f = super::open_read_maybe_gz(&path)?;
        let mut buf = String::new();
        f.read_to_string(&mut buf)?;

        assert_eq!(buf, "rsid\tgenotype\nrs1234\tAG\n");

        Ok(())
    }

    #[test]
    fn sha256sum_empty_file() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("empty.txt");
        std::fs::write(&path, b"")?;

        assert_eq!(
            super::sha256sum(&path)?,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );

        Ok(())
    }
}
