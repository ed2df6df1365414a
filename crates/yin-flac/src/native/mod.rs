//! 原生 FLAC 比特流引擎.
//!
//! [`NativeEngine`] 是一个增量式状态机, 调用方每次传入游标之后的剩余输入,
//! 引擎返回消费的字节数. 引擎内部只记录当前所处的结构 (元数据块 / 帧边界)
//! 以及从 STREAMINFO 中看到的采样率和位深, 不持有输入数据.

mod frame;
mod subframe;
mod sync;

use log::{debug, trace};
use yin_core::bitreader::BitReader;
use yin_core::{YinError, YinResult};

use crate::engine::{BitstreamEngine, FrameHeader, StreamInfoField};
use crate::metadata::{
    BLOCK_HEADER_LEN, MD5_BIT_OFFSET, MetadataBlockHeader, MetadataBlockType, STREAM_INFO_LEN,
    STREAM_MARKER, stream_info_field_bits,
};
use crate::scratch::FrameScratch;
use frame::FrameContext;
use sync::StreamStart;

/// 引擎配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// 帧头 CRC-8 / 帧尾 CRC-16 不匹配时是否报错 (否则仅记录日志)
    pub verify_crc: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { verify_crc: true }
    }
}

/// 引擎在码流中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// 尚未同步
    Init,
    /// 位于元数据块体内, `consumed` 为块体中已消费的字节数
    Metadata {
        header: MetadataBlockHeader,
        consumed: usize,
    },
    /// 位于音频帧边界
    FrameBoundary,
    /// 码流已结束
    Finished,
}

/// 原生 FLAC 比特流引擎
pub struct NativeEngine {
    config: EngineConfig,
    state: State,
    stream_sample_rate: Option<u32>,
    stream_bits_per_sample: Option<u32>,
    frame_header: Option<FrameHeader>,
}

impl NativeEngine {
    /// 使用默认配置创建引擎
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// 使用指定配置创建引擎
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            state: State::Init,
            stream_sample_rate: None,
            stream_bits_per_sample: None,
            frame_header: None,
        }
    }

    /// 当前配置
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 从码流起点同步: "fLaC" 标记或首个有效帧头
    fn sync_stream_start(&mut self, input: &[u8]) -> YinResult<usize> {
        match sync::find_stream_start(input) {
            Some(StreamStart::Marker(offset)) => {
                let header_at = offset + STREAM_MARKER.len();
                let header = MetadataBlockHeader::parse(&input[header_at..])?;
                debug!(
                    "找到 fLaC 标记: 偏移={}, 首个元数据块={:?}",
                    offset, header.block_type,
                );
                self.enter_block(header);
                Ok(header_at + BLOCK_HEADER_LEN)
            }
            Some(StreamStart::Frame(offset)) => {
                debug!("未找到 fLaC 标记, 从偏移 {} 的帧头开始", offset);
                self.state = State::FrameBoundary;
                Ok(offset)
            }
            None => Err(YinError::SyncNotFound(
                "输入中没有 fLaC 标记或有效帧头".into(),
            )),
        }
    }

    /// 跳过当前元数据块的剩余部分, 进入下一个块或首个音频帧
    fn sync_past_block(
        &mut self,
        input: &[u8],
        header: MetadataBlockHeader,
        consumed: usize,
    ) -> YinResult<usize> {
        let remaining = (header.length as usize).saturating_sub(consumed);
        if input.len() < remaining {
            return Err(YinError::Eof);
        }
        if header.block_type == MetadataBlockType::StreamInfo && consumed == 0 {
            self.remember_stream_info(&input[..remaining])?;
        }

        if !header.is_last {
            let next = MetadataBlockHeader::parse(&input[remaining..])?;
            trace!("元数据块: {:?}, {} 字节", next.block_type, next.length);
            self.enter_block(next);
            return Ok(remaining + BLOCK_HEADER_LEN);
        }

        self.state = State::FrameBoundary;
        self.sync_to_frame(input, remaining)
    }

    /// 从 `from` 开始定位下一个帧头, 输入已用尽时进入结束状态
    fn sync_to_frame(&mut self, input: &[u8], from: usize) -> YinResult<usize> {
        if from >= input.len() {
            self.state = State::Finished;
            return Ok(input.len());
        }
        match sync::find_frame_sync(input, from) {
            Some(offset) => {
                if offset > from {
                    debug!("跳过 {} 字节无法识别的数据", offset - from);
                }
                self.state = State::FrameBoundary;
                Ok(offset)
            }
            None => Err(YinError::SyncNotFound(format!(
                "剩余 {} 字节中没有有效帧头",
                input.len() - from,
            ))),
        }
    }

    fn enter_block(&mut self, header: MetadataBlockHeader) {
        self.state = State::Metadata {
            header,
            consumed: 0,
        };
    }

    /// 跳过未逐字段读取的 STREAMINFO 时, 仍记下帧头解码需要的采样率和位深
    fn remember_stream_info(&mut self, body: &[u8]) -> YinResult<()> {
        let (_, sample_rate) = read_body_bits(body, 0, StreamInfoField::SampleRate)?;
        let (_, bits) = read_body_bits(body, 0, StreamInfoField::BitsPerSample)?;
        self.stream_sample_rate = Some(sample_rate as u32);
        self.stream_bits_per_sample = Some(bits as u32 + 1);
        Ok(())
    }

    /// 当前 STREAMINFO 块的已消费字节数
    fn stream_info_cursor(&self) -> YinResult<(MetadataBlockHeader, usize)> {
        match self.state {
            State::Metadata { header, consumed }
                if header.block_type == MetadataBlockType::StreamInfo =>
            {
                Ok((header, consumed))
            }
            _ => Err(YinError::InvalidArgument(
                "当前位置不在 STREAMINFO 块内".into(),
            )),
        }
    }
}

impl Default for NativeEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 从 STREAMINFO 块体读取一个字段
///
/// `consumed` 为块体中已消费的字节数, 返回 (新消费的字节数, 原始字段值).
/// 字段结束处不足一字节的部分不计入消费, 留给下一个字段.
fn read_body_bits(
    input: &[u8],
    consumed: usize,
    field: StreamInfoField,
) -> YinResult<(usize, u64)> {
    let (start_bit, width) = stream_info_field_bits(field);
    let consumed_bits = consumed * 8;
    if start_bit < consumed_bits {
        return Err(YinError::InvalidArgument(format!(
            "STREAMINFO 字段 {} 已被跳过, 字段必须按顺序提取",
            field,
        )));
    }

    let end_bit = start_bit + width as usize;
    let needed = end_bit.div_ceil(8) - consumed;
    if input.len() < needed {
        return Err(YinError::Eof);
    }

    let mut br = BitReader::new(&input[..needed]);
    br.skip_bits(start_bit - consumed_bits)?;
    let value = br.read_bits_u64(width)?;
    Ok((end_bit / 8 - consumed, value))
}

impl BitstreamEngine for NativeEngine {
    fn reset(&mut self) {
        self.state = State::Init;
        self.stream_sample_rate = None;
        self.stream_bits_per_sample = None;
        self.frame_header = None;
    }

    fn sync(&mut self, input: &[u8]) -> YinResult<usize> {
        match self.state {
            State::Init => self.sync_stream_start(input),
            State::Metadata { header, consumed } => self.sync_past_block(input, header, consumed),
            State::FrameBoundary | State::Finished => self.sync_to_frame(input, 0),
        }
    }

    fn is_at_metadata_block(&self) -> bool {
        matches!(self.state, State::Metadata { .. })
    }

    fn is_stream_info_block(&self) -> bool {
        matches!(
            self.state,
            State::Metadata { header, .. } if header.block_type == MetadataBlockType::StreamInfo
        )
    }

    fn extract_stream_info_field(
        &mut self,
        input: &[u8],
        field: StreamInfoField,
    ) -> YinResult<(usize, u64)> {
        let (header, consumed) = self.stream_info_cursor()?;
        let (used, raw) = read_body_bits(input, consumed, field)?;
        self.state = State::Metadata {
            header,
            consumed: consumed + used,
        };

        let value = match field {
            StreamInfoField::ChannelCount | StreamInfoField::BitsPerSample => raw + 1,
            _ => raw,
        };
        match field {
            StreamInfoField::SampleRate => self.stream_sample_rate = Some(value as u32),
            StreamInfoField::BitsPerSample => self.stream_bits_per_sample = Some(value as u32),
            _ => {}
        }
        Ok((used, value))
    }

    fn extract_md5_signature(&mut self, input: &[u8]) -> YinResult<(usize, [u8; 16])> {
        let (header, consumed) = self.stream_info_cursor()?;
        if consumed * 8 > MD5_BIT_OFFSET {
            return Err(YinError::InvalidArgument("MD5 签名已被跳过".into()));
        }

        let needed = STREAM_INFO_LEN - consumed;
        if input.len() < needed {
            return Err(YinError::Eof);
        }
        let mut br = BitReader::new(&input[..needed]);
        br.skip_bits(MD5_BIT_OFFSET - consumed * 8)?;
        let mut signature = [0u8; 16];
        for byte in &mut signature {
            *byte = br.read_bits(8)? as u8;
        }

        self.state = State::Metadata {
            header,
            consumed: STREAM_INFO_LEN,
        };
        Ok((needed, signature))
    }

    fn decode_frame(
        &mut self,
        input: &[u8],
        scratch: &mut FrameScratch,
    ) -> YinResult<(usize, FrameHeader)> {
        let mut consumed = 0;
        loop {
            match self.state {
                State::FrameBoundary => break,
                State::Finished => return Err(YinError::Eof),
                State::Init | State::Metadata { .. } => consumed += self.sync(&input[consumed..])?,
            }
        }

        let data = &input[consumed..];
        if data.is_empty() {
            self.state = State::Finished;
            return Err(YinError::Eof);
        }

        let ctx = FrameContext {
            stream_sample_rate: self.stream_sample_rate,
            stream_bits_per_sample: self.stream_bits_per_sample,
            verify_crc: self.config.verify_crc,
        };
        let (used, header) = frame::decode_frame(data, &ctx, scratch)?;
        trace!(
            "解码帧 {:?}: {} 采样 x {} 声道, {} 字节",
            header.number, header.block_size, header.channels, used,
        );
        self.frame_header = Some(header.clone());
        Ok((consumed + used, header))
    }

    fn frame_header(&self) -> Option<&FrameHeader> {
        self.frame_header.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yin_core::bitwriter::BitWriter;
    use yin_core::crc;

    /// 44.1kHz / 2 声道 / 16 位 / 总采样 4 的 STREAMINFO 块体
    fn stream_info_body() -> Vec<u8> {
        let mut bw = BitWriter::new();
        bw.write_bits(4, 16);
        bw.write_bits(4, 16);
        bw.write_bits(0, 24);
        bw.write_bits(0, 24);
        bw.write_bits(44100, 20);
        bw.write_bits(1, 3);
        bw.write_bits(15, 5);
        bw.write_bits_u64(4, 36);
        for i in 0..16 {
            bw.write_bits(i, 8);
        }
        bw.finish()
    }

    /// 块大小 4, 采样率和位深取自 STREAMINFO, 两个 Constant 子帧
    fn constant_frame(left: i32, right: i32) -> Vec<u8> {
        let mut bw = BitWriter::new();
        bw.write_bits(0b11_1111_1111_1110, 14);
        bw.write_bits(0, 2);
        bw.write_bits(6, 4);
        bw.write_bits(0, 4);
        bw.write_bits(1, 4);
        bw.write_bits(0, 3);
        bw.write_bit(0);
        bw.write_utf8_u64(0);
        bw.write_bits(3, 8);
        let mut data = bw.finish();
        data.push(crc::crc8(&data));

        let mut bw = BitWriter::new();
        for &b in &data {
            bw.write_bits(u32::from(b), 8);
        }
        for value in [left, right] {
            bw.write_bits(0, 8);
            bw.write_bits_signed(value, 16);
        }
        let mut data = bw.finish();
        let crc = crc::crc16(&data);
        data.extend_from_slice(&crc.to_be_bytes());
        data
    }

    fn flac_stream(frames: &[Vec<u8>]) -> Vec<u8> {
        let mut data = b"fLaC".to_vec();
        data.extend_from_slice(&[0x80, 0x00, 0x00, 34]);
        data.extend_from_slice(&stream_info_body());
        for frame in frames {
            data.extend_from_slice(frame);
        }
        data
    }

    #[test]
    fn test_sync_skips_leading_junk() {
        let mut data = b"junk".to_vec();
        data.extend_from_slice(&flac_stream(&[]));

        let mut engine = NativeEngine::new();
        assert_eq!(engine.sync(&data).unwrap(), 12);
        assert!(engine.is_at_metadata_block());
        assert!(engine.is_stream_info_block());
    }

    #[test]
    fn test_sync_without_marker() {
        let mut engine = NativeEngine::new();
        let err = engine.sync(b"RIFF\0\0\0\0WAVE").unwrap_err();
        assert!(matches!(err, YinError::SyncNotFound(_)));
    }

    #[test]
    fn test_extract_fields_in_order() {
        let data = flac_stream(&[]);
        let mut engine = NativeEngine::new();
        let mut pos = engine.sync(&data).unwrap();

        let mut extract = |engine: &mut NativeEngine, field| {
            let (used, value) = engine
                .extract_stream_info_field(&data[pos..], field)
                .unwrap();
            pos += used;
            (used, value)
        };
        assert_eq!(extract(&mut engine, StreamInfoField::SampleRate), (12, 44100));
        assert_eq!(extract(&mut engine, StreamInfoField::ChannelCount), (0, 2));
        assert_eq!(extract(&mut engine, StreamInfoField::BitsPerSample), (1, 16));
        assert_eq!(extract(&mut engine, StreamInfoField::TotalSamples), (5, 4));

        let (used, md5) = engine.extract_md5_signature(&data[pos..]).unwrap();
        assert_eq!(used, 16);
        assert_eq!(md5[15], 15);
    }

    #[test]
    fn test_extract_field_out_of_order() {
        let data = flac_stream(&[]);
        let mut engine = NativeEngine::new();
        let pos = engine.sync(&data).unwrap();
        let (used, _) = engine
            .extract_stream_info_field(&data[pos..], StreamInfoField::TotalSamples)
            .unwrap();
        let err = engine
            .extract_stream_info_field(&data[pos + used..], StreamInfoField::SampleRate)
            .unwrap_err();
        assert!(matches!(err, YinError::InvalidArgument(_)));
    }

    #[test]
    fn test_extract_field_truncated() {
        let data = flac_stream(&[]);
        let mut engine = NativeEngine::new();
        let pos = engine.sync(&data).unwrap();
        let err = engine
            .extract_stream_info_field(&data[pos..pos + 8], StreamInfoField::SampleRate)
            .unwrap_err();
        assert!(matches!(err, YinError::Eof));
    }

    #[test]
    fn test_extract_outside_stream_info() {
        let mut engine = NativeEngine::new();
        let err = engine
            .extract_stream_info_field(&[0; 34], StreamInfoField::SampleRate)
            .unwrap_err();
        assert!(matches!(err, YinError::InvalidArgument(_)));
    }

    #[test]
    fn test_decode_frames_after_metadata() {
        let _ = env_logger::builder().is_test(true).try_init();
        let data = flac_stream(&[constant_frame(1, -1), constant_frame(2, -2)]);
        let mut engine = NativeEngine::new();
        let mut scratch = FrameScratch::new();

        // 不读取任何字段, 直接解码: 引擎自行跳过 STREAMINFO
        let mut pos = 0;
        let (used, header) = engine.decode_frame(&data[pos..], &mut scratch).unwrap();
        pos += used;
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(&scratch.channel(1)[..4], &[-1; 4]);

        let (used, _) = engine.decode_frame(&data[pos..], &mut scratch).unwrap();
        pos += used;
        assert_eq!(&scratch.channel(0)[..4], &[2; 4]);
        assert_eq!(pos, data.len());
        assert_eq!(engine.frame_header().map(|h| h.block_size), Some(4));

        assert!(matches!(
            engine.decode_frame(&data[pos..], &mut scratch),
            Err(YinError::Eof)
        ));
    }

    #[test]
    fn test_metadata_only_stream_finishes() {
        let data = flac_stream(&[]);
        let mut engine = NativeEngine::new();
        let pos = engine.sync(&data).unwrap();
        assert_eq!(engine.sync(&data[pos..]).unwrap(), 34);
        assert!(!engine.is_at_metadata_block());

        let mut scratch = FrameScratch::new();
        assert!(matches!(
            engine.decode_frame(&[], &mut scratch),
            Err(YinError::Eof)
        ));
    }

    #[test]
    fn test_reset_forgets_stream() {
        let data = flac_stream(&[]);
        let mut engine = NativeEngine::new();
        engine.sync(&data).unwrap();
        engine.reset();
        assert!(!engine.is_at_metadata_block());
        assert!(engine.frame_header().is_none());
    }
}
