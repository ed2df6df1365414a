//! 同步阶段.

use tracing::debug;
use yin_flac::BitstreamEngine;

use super::Cursor;
use crate::error::DecodeError;

/// 定位码流起点并越过它, 失败即终止解码
pub(crate) fn synchronize<E>(engine: &mut E, cursor: &mut Cursor<'_>) -> Result<(), DecodeError>
where
    E: BitstreamEngine + ?Sized,
{
    let consumed = engine
        .sync(cursor.remaining())
        .map_err(DecodeError::SyncFailure)?;
    cursor.advance(consumed);
    debug!("同步完成, 消费 {} 字节", consumed);
    Ok(())
}
