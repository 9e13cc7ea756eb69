mod common;

use common::{ChunkBuilder, HEADER_LEN, RETURN_0_1, minimal_chunk};
use lua_bytecode::{Listing, Loader, StringInterner, dump, load};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum K {
    Nil,
    Boolean(bool),
    Float(f64),
    Integer(i32),
    String(Vec<u8>),
}

fn constant() -> impl Strategy<Value = K> {
    prop_oneof![
        Just(K::Nil),
        any::<bool>().prop_map(K::Boolean),
        (-1.0e9f64..1.0e9).prop_map(K::Float),
        any::<i32>().prop_map(K::Integer),
        prop::collection::vec(any::<u8>(), 0..300).prop_map(K::String),
    ]
}

fn chunk(constants: &[K], code: &[u32], lines: &[i32]) -> Vec<u8> {
    let mut builder = ChunkBuilder::new()
        .header()
        .byte(1)
        .function_start(Some(b"@prop.lua"), 0, 0)
        .code(code)
        .int(constants.len() as i32);
    for k in constants {
        builder = match k {
            K::Nil => builder.byte(0x00),
            K::Boolean(b) => builder.byte(0x01).byte(*b as u8),
            K::Float(n) => builder.byte(0x03).number(*n),
            K::Integer(i) => builder.byte(0x13).int(*i),
            K::String(s) if s.len() <= 40 => builder.byte(0x04).string(Some(s)),
            K::String(s) => builder.byte(0x14).string(Some(s)),
        };
    }
    builder = builder
        .upvalues(&[(1, 0)])
        .int(1)
        .empty_function(None, 1)
        .int(lines.len() as i32);
    for line in lines {
        builder = builder.int(*line);
    }
    builder.int(0).int(1).string(Some(b"_ENV")).build()
}

proptest! {
    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let interner = StringInterner::new();
        let _ = load(&bytes, "=fuzz", &interner);
    }

    #[test]
    fn prop_corrupted_body_never_panics(
        at in 0usize..64,
        value in any::<u8>(),
    ) {
        let mut bytes = minimal_chunk();
        let at = HEADER_LEN + at % (bytes.len() - HEADER_LEN);
        bytes[at] = value;

        let interner = StringInterner::new();
        if let Ok(closure) = Loader::new(&interner).load(&bytes, "=fuzz") {
            let _ = Listing::full().render(closure.proto());
        }
    }

    #[test]
    fn prop_truncated_chunks_fail(
        constants in prop::collection::vec(constant(), 0..8),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = chunk(&constants, &[RETURN_0_1], &[1]);
        let len = cut.index(bytes.len());
        let interner = StringInterner::new();
        prop_assert!(load(&bytes[..len], "=cut", &interner).is_err());
    }

    #[test]
    fn prop_load_dump_load(
        constants in prop::collection::vec(constant(), 0..16),
        code in prop::collection::vec(any::<u32>(), 1..32),
        lines in prop::collection::vec(0i32..10_000, 0..32),
        strip in any::<bool>(),
    ) {
        let interner = StringInterner::new();
        let bytes = chunk(&constants, &code, &lines);
        let first = load(&bytes, "=prop", &interner).unwrap();
        prop_assert_eq!(first.proto().constants().len(), constants.len());

        let dumped = dump(&first, strip).unwrap();
        let second = Loader::new(&interner)
            .keep_debug_info(!strip)
            .load(&dumped, "=prop")
            .unwrap();
        prop_assert_eq!(second.proto().code(), first.proto().code());
        prop_assert_eq!(second.proto().constants(), first.proto().constants());

        if !strip {
            prop_assert_eq!(&second, &first);
            prop_assert_eq!(&dumped, &bytes);
        }
    }
}
