//! Constant pool reading

use crate::core::constants::{Constant, Intern, tag};
use crate::error::LoadErrorKind;
use crate::loader::cursor::{ByteCursor, ReadResult, preallocate};

/// Read one function's count-prefixed constant pool. String payloads are
/// handed to `interner`; an absent string is interned as the empty string.
pub(crate) fn read_constants<I: Intern + ?Sized>(
    cursor: &mut ByteCursor<'_>,
    interner: &I,
) -> ReadResult<Vec<Constant>> {
    let count = cursor.read_count(1)?;
    let mut constants = preallocate(count);
    for _ in 0..count {
        constants.push(read_constant(cursor, interner)?);
    }
    Ok(constants)
}

fn read_constant<I: Intern + ?Sized>(
    cursor: &mut ByteCursor<'_>,
    interner: &I,
) -> ReadResult<Constant> {
    let tag = cursor.read_byte()?;
    let constant = match tag {
        tag::NIL => Constant::Nil,
        tag::BOOLEAN => Constant::Boolean(cursor.read_byte()? != 0),
        tag::NUMFLT => Constant::Float(cursor.read_number()?),
        tag::NUMINT => Constant::Integer(cursor.read_integer()?),
        tag::SHRSTR | tag::LNGSTR => {
            let bytes = cursor.read_string()?.unwrap_or_default();
            Constant::String(interner.intern(bytes))
        }
        _ => return Err(LoadErrorKind::UnrecognizedConstantTag { tag }),
    };
    Ok(constant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::StringInterner;
    use pretty_assertions::assert_eq;

    fn pool(entries: &[&[u8]]) -> Vec<u8> {
        let mut bytes = (entries.len() as i32).to_le_bytes().to_vec();
        for entry in entries {
            bytes.extend_from_slice(entry);
        }
        bytes
    }

    #[test]
    fn test_every_kind() {
        let float = [&[tag::NUMFLT][..], &2.5f64.to_le_bytes()].concat();
        let int = [&[tag::NUMINT][..], &42i32.to_le_bytes()].concat();
        let bytes = pool(&[
            &[tag::NIL],
            &[tag::BOOLEAN, 1],
            &[tag::BOOLEAN, 0],
            &float,
            &int,
            &[tag::SHRSTR, 4, b'a', 0, 0xE9],
        ]);

        let interner = StringInterner::new();
        let mut cursor = ByteCursor::new(&bytes);
        let constants = read_constants(&mut cursor, &interner).unwrap();

        assert_eq!(
            constants,
            vec![
                Constant::Nil,
                Constant::Boolean(true),
                Constant::Boolean(false),
                Constant::Float(2.5),
                Constant::Integer(42),
                Constant::String(interner.intern(b"a\0\xe9")),
            ]
        );
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_equal_strings_share_handle() {
        let bytes = pool(&[&[tag::SHRSTR, 3, b'h', b'i'], &[tag::LNGSTR, 3, b'h', b'i']]);
        let interner = StringInterner::new();
        let mut cursor = ByteCursor::new(&bytes);
        let constants = read_constants(&mut cursor, &interner).unwrap();

        let (a, b) = (constants[0].as_str().unwrap(), constants[1].as_str().unwrap());
        assert!(a.ptr_eq(b));
        assert_eq!(interner.count(), 1);
    }

    #[test]
    fn test_unknown_tag() {
        let bytes = pool(&[&[tag::NIL], &[0x07]]);
        let interner = StringInterner::new();
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(
            read_constants(&mut cursor, &interner),
            Err(LoadErrorKind::UnrecognizedConstantTag { tag: 7 })
        );
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = pool(&[&[tag::NUMFLT, 0, 0, 0]]);
        let interner = StringInterner::new();
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(
            read_constants(&mut cursor, &interner),
            Err(LoadErrorKind::BufferUnderrun {
                requested: 8,
                remaining: 3
            })
        );
    }
}
