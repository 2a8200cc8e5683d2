use encoding_rs::GBK;
use log::{debug, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("question bank {0:?} does not exist")]
    NotFound(PathBuf),
    #[error("cannot read question bank")]
    Read(#[from] io::Error),
}

/// Reads the bank as one text blob. Files that are not UTF-8 are decoded as
/// GBK, the usual encoding of banks saved on Chinese Windows.
pub fn load(path: &Path) -> Result<String, SourceError> {
    if !path.exists() {
        warn!("[Source] {:?} not found", path);
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    let now = Instant::now();
    let bytes = std::fs::read(path)?;
    info!("[Source] Read {} bytes from {:?}", bytes.len(), path);
    let text = decode(bytes);
    debug!("[Source] Decoding took {} ms.", now.elapsed().as_millis());
    Ok(text)
}

fn decode(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(
                "[Source] Not valid UTF-8 (at byte {}), decoding as GBK",
                err.utf8_error().valid_up_to()
            );
            let (text, _, had_errors) = GBK.decode(err.as_bytes());
            if had_errors {
                warn!("[Source] Some bytes are not valid GBK either and were replaced");
            }
            text.into_owned()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libtiku::parser::parse;

    #[test]
    fn missing_file_is_not_found() {
        let err = load(Path::new("definitely/not/here/tiku.txt")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn bom_is_stripped() {
        let text = decode("\u{feff}一、单项选择题".as_bytes().to_vec());
        assert_eq!(text, "一、单项选择题");
    }

    #[test]
    fn gbk_bank_still_parses() {
        let bytes = b"\xd2\xbb\xa1\xa2\xb5\xa5\xcf\xee\xd1\xa1\xd4\xf1\xcc\xe2\n\
            1.\xd6\xd0\xb9\xfa\xb5\xc4\xca\xd7\xb6\xbc\xca\xc7\n\
            A.\xc9\xcf\xba\xa3\nB.\xb1\xb1\xbe\xa9\n\xb4\xf0\xb0\xb8\xa3\xbaB\n";
        let text = decode(bytes.to_vec());
        assert!(text.starts_with("一、单项选择题\n1.中国的首都是"));

        let bank = parse(&text);
        assert_eq!(bank.single.len(), 1);
        assert_eq!(bank.single[0].options[&'B'], "北京");
        assert_eq!(bank.single[0].answer, vec!['B']);
    }

    #[test]
    fn bytes_invalid_in_both_encodings_are_replaced() {
        let text = decode(vec![b'1', b'.', 0xff, b'x']);
        assert_eq!(text, "1.\u{fffd}x");
    }

    #[test]
    fn reads_a_real_file() {
        let path = std::env::temp_dir().join(format!("tiku-source-{}.txt", std::process::id()));
        std::fs::write(&path, "一、判断题\n1.题\n答案：对\n").unwrap();
        let text = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(text.starts_with("一、判断题"));
    }
}
