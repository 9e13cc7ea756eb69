//! Debug section: line info, locals, upvalue names

use crate::core::prototype::{LocalVar, Prototype};
use crate::error::LoadErrorKind;
use crate::loader::cursor::{ByteCursor, ReadResult, preallocate};
use crate::loader::header::INT_SIZE;

/// Fill `proto`'s debug fields from the cursor.
///
/// The line array is taken as-is even when its length differs from the
/// code length. Upvalue names are matched to upvalues by position; naming
/// more upvalues than the function declares is an error.
pub(crate) fn read_debug(cursor: &mut ByteCursor<'_>, proto: &mut Prototype) -> ReadResult<()> {
    let count = cursor.read_count(INT_SIZE)?;
    let mut line_info = preallocate(count);
    for _ in 0..count {
        line_info.push(cursor.read_int()?);
    }
    proto.line_info = line_info;

    // name prefix byte + startpc + endpc
    let count = cursor.read_count(1 + 2 * INT_SIZE)?;
    let mut local_vars = preallocate(count);
    for _ in 0..count {
        let name = cursor.read_string()?.unwrap_or_default().to_vec();
        local_vars.push(LocalVar {
            name,
            start_pc: cursor.read_int()?,
            end_pc: cursor.read_int()?,
        });
    }
    proto.local_vars = local_vars;

    let count = cursor.read_count(1)?;
    if count > proto.upvalues.len() {
        return Err(LoadErrorKind::UpvalueNameOverflow {
            upvalues: proto.upvalues.len(),
            names: count,
        });
    }
    for upvalue in proto.upvalues.iter_mut().take(count) {
        upvalue.name = cursor.read_string()?.map(<[u8]>::to_vec);
    }

    Ok(())
}
