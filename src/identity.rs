/// Bit that marks an identity as an externally added (non-Store) shortcut.
pub const EXTERNAL_BIT: u32 = 0x8000_0000;

/// Derives the shortcut identity Steam uses for non-Store entries.
///
/// The checksum input is `executable_path + name + arguments` with no
/// separators. Collisions in the 32-bit space are possible and are not
/// detected.
pub fn assign(name: &str, executable_path: &str, arguments: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(executable_path.as_bytes());
    hasher.update(name.as_bytes());
    hasher.update(arguments.as_bytes());
    hasher.finalize() | EXTERNAL_BIT
}

/// Masks any integer-like identity down to its low 32 bits.
pub fn normalize<T: Into<i128>>(raw: Option<T>) -> Option<u32> {
    raw.map(|value| (value.into() & 0xFFFF_FFFF) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_is_deterministic() {
        let a = assign("MyGame", r"D:\Games\MyGame\MyGame.exe", "");
        let b = assign("MyGame", r"D:\Games\MyGame\MyGame.exe", "");
        assert_eq!(a, b);
    }

    #[test]
    fn assign_always_sets_top_bit() {
        let inputs = [
            ("", "", ""),
            ("Portal", "/opt/games/portal.exe", "-novid"),
            ("Ünïcødé", "C:\\Spiele\\Ünïcødé.exe", "--lang=de"),
        ];
        for (name, exe, args) in inputs {
            assert_eq!(assign(name, exe, args) & EXTERNAL_BIT, EXTERNAL_BIT);
        }
    }

    #[test]
    fn assign_matches_plain_crc_with_top_bit() {
        let exe = "/games/MyGame/MyGame.exe";
        let expected = crc32fast::hash(format!("{exe}MyGame").as_bytes()) | 0x8000_0000;
        assert_eq!(assign("MyGame", exe, ""), expected);
    }

    #[test]
    fn arguments_change_identity() {
        let exe = "/games/emu.exe";
        assert_ne!(assign("Emu", exe, ""), assign("Emu", exe, "-rom a.bin"));
    }

    #[test]
    fn normalize_masks_signed_and_out_of_range() {
        assert_eq!(normalize(Some(-1i64)), Some(0xFFFF_FFFF));
        assert_eq!(normalize(Some(-2_000_000_000i32)), Some(2_294_967_296));
        assert_eq!(normalize(Some(0x1_2345_6789u64)), Some(0x2345_6789));
        assert_eq!(normalize::<i64>(None), None);
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [0i64, 1, -1, i64::MAX, i64::MIN, 0xFFFF_FFFF, 0x1_0000_0000] {
            let once = normalize(Some(raw));
            assert_eq!(normalize(once), once);
            assert!(u64::from(once.unwrap_or(0)) <= 0xFFFF_FFFF);
        }
    }
}
