use std::path::PathBuf;

/// Number of key characters per directory segment.
pub const PATH_SEGMENT_LEN: usize = 3;

/// Maps a shard key to its relative path.
///
/// The key is split into chunks of [`PATH_SEGMENT_LEN`] characters, left to
/// right, and the chunks become path components. The last chunk may be
/// shorter. `extension` is appended verbatim to the last component, so an
/// empty extension adds nothing.
///
/// ```
/// use std::path::Path;
/// use pwned_store::shard_path;
///
/// assert_eq!(shard_path("abcde", ".bin"), Path::new("abc").join("de.bin"));
/// ```
pub fn shard_path(key: &str, extension: &str) -> PathBuf {
    let chars: Vec<char> = key.chars().collect();
    let mut segments = chars.chunks(PATH_SEGMENT_LEN).peekable();

    let mut path = PathBuf::new();
    while let Some(segment) = segments.next() {
        let mut component: String = segment.iter().collect();
        if segments.peek().is_none() {
            component.push_str(extension);
        }
        path.push(component);
    }

    if key.is_empty() {
        path.push(extension);
    }

    path
}
