//! Decoder for FileDescriptorSet from protobuf binary format.

use std::io::Read;

use bytes::Buf;

use super::*;
use crate::error::DecodeError;

/// Maximum size for a single message (64MB).
/// This prevents DoS attacks from malicious input with huge length values.
const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Maximum bytes for a 64-bit varint (10 bytes).
const MAX_VARINT_BYTES: usize = 10;

/// Protobuf wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireType {
    Varint = 0,
    I64 = 1,
    Len = 2,
    SGroup = 3,
    EGroup = 4,
    I32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::Varint),
            1 => Ok(Self::I64),
            2 => Ok(Self::Len),
            3 => Ok(Self::SGroup),
            4 => Ok(Self::EGroup),
            5 => Ok(Self::I32),
            other => Err(DecodeError::InvalidWireType(other)),
        }
    }
}

/// Decode a FileDescriptorSet from protobuf binary data.
pub fn decode_file_descriptor_set(data: &[u8]) -> Result<FileDescriptorSet, DecodeError> {
    let mut buf = data;
    let mut fds = FileDescriptorSet::default();

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => {
                let msg = decode_nested(&mut buf, wire_type)?;
                fds.file.push(decode_file_descriptor_proto(msg)?);
            }
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    tracing::debug!(files = fds.file.len(), "decoded FileDescriptorSet");
    Ok(fds)
}

/// Read a FileDescriptorSet from any byte source, e.g. the file protoc wrote.
pub fn decode_file_descriptor_set_from(mut reader: impl Read) -> Result<FileDescriptorSet, DecodeError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode_file_descriptor_set(&data)
}

/// Decode a FileDescriptorProto.
fn decode_file_descriptor_proto(data: &[u8]) -> Result<FileDescriptorProto, DecodeError> {
    let mut buf = data;
    let mut fdp = FileDescriptorProto::default();

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => fdp.name = Some(decode_string(&mut buf, wire_type)?),
            2 => fdp.package = Some(decode_string(&mut buf, wire_type)?),
            3 => fdp.dependency.push(decode_string(&mut buf, wire_type)?),
            4 => {
                let msg = decode_nested(&mut buf, wire_type)?;
                fdp.message_type.push(decode_descriptor_proto(msg)?);
            }
            5 => {
                let msg = decode_nested(&mut buf, wire_type)?;
                fdp.enum_type.push(decode_enum_descriptor_proto(msg)?);
            }
            12 => fdp.syntax = Some(decode_string(&mut buf, wire_type)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(fdp)
}

/// Decode a DescriptorProto (message type).
fn decode_descriptor_proto(data: &[u8]) -> Result<DescriptorProto, DecodeError> {
    let mut buf = data;
    let mut dp = DescriptorProto::default();

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => dp.name = Some(decode_string(&mut buf, wire_type)?),
            2 => {
                let msg = decode_nested(&mut buf, wire_type)?;
                dp.field.push(decode_field_descriptor_proto(msg)?);
            }
            3 => {
                let msg = decode_nested(&mut buf, wire_type)?;
                dp.nested_type.push(decode_descriptor_proto(msg)?);
            }
            4 => {
                let msg = decode_nested(&mut buf, wire_type)?;
                dp.enum_type.push(decode_enum_descriptor_proto(msg)?);
            }
            7 => {
                let msg = decode_nested(&mut buf, wire_type)?;
                dp.options = Some(decode_message_options(msg)?);
            }
            8 => {
                let msg = decode_nested(&mut buf, wire_type)?;
                dp.oneof_decl.push(decode_oneof_descriptor_proto(msg)?);
            }
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(dp)
}

/// Decode a FieldDescriptorProto.
fn decode_field_descriptor_proto(data: &[u8]) -> Result<FieldDescriptorProto, DecodeError> {
    let mut buf = data;
    let mut fdp = FieldDescriptorProto::default();

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => fdp.name = Some(decode_string(&mut buf, wire_type)?),
            3 => fdp.number = Some(decode_int32(&mut buf, wire_type)?),
            4 => fdp.label = Some(decode_int32(&mut buf, wire_type)?),
            5 => fdp.r#type = Some(decode_int32(&mut buf, wire_type)?),
            6 => fdp.type_name = Some(decode_string(&mut buf, wire_type)?),
            7 => fdp.default_value = Some(decode_string(&mut buf, wire_type)?),
            9 => fdp.oneof_index = Some(decode_int32(&mut buf, wire_type)?),
            10 => fdp.json_name = Some(decode_string(&mut buf, wire_type)?),
            17 => fdp.proto3_optional = Some(decode_bool(&mut buf, wire_type)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(fdp)
}

/// Decode an EnumDescriptorProto.
fn decode_enum_descriptor_proto(data: &[u8]) -> Result<EnumDescriptorProto, DecodeError> {
    let mut buf = data;
    let mut edp = EnumDescriptorProto::default();

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => edp.name = Some(decode_string(&mut buf, wire_type)?),
            2 => {
                let msg = decode_nested(&mut buf, wire_type)?;
                edp.value.push(decode_enum_value_descriptor_proto(msg)?);
            }
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(edp)
}

/// Decode an EnumValueDescriptorProto.
fn decode_enum_value_descriptor_proto(
    data: &[u8],
) -> Result<EnumValueDescriptorProto, DecodeError> {
    let mut buf = data;
    let mut evdp = EnumValueDescriptorProto::default();

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => evdp.name = Some(decode_string(&mut buf, wire_type)?),
            2 => evdp.number = Some(decode_int32(&mut buf, wire_type)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(evdp)
}

/// Decode a OneofDescriptorProto.
fn decode_oneof_descriptor_proto(data: &[u8]) -> Result<OneofDescriptorProto, DecodeError> {
    let mut buf = data;
    let mut odp = OneofDescriptorProto::default();

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => odp.name = Some(decode_string(&mut buf, wire_type)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(odp)
}

/// Decode MessageOptions.
fn decode_message_options(data: &[u8]) -> Result<MessageOptions, DecodeError> {
    let mut buf = data;
    let mut mo = MessageOptions::default();

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            7 => mo.map_entry = Some(decode_bool(&mut buf, wire_type)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(mo)
}

/// Decode a field key (tag number + wire type).
fn decode_key(buf: &mut &[u8]) -> Result<(u32, WireType), DecodeError> {
    let key = decode_varint(buf)?;
    let wire_type = WireType::try_from((key & 0x07) as u8)?;
    let field_number = (key >> 3) as u32;
    Ok((field_number, wire_type))
}

/// Fail unless a known field arrived with the wire type its schema declares.
fn expect_wire_type(actual: WireType, expected: WireType) -> Result<(), DecodeError> {
    if actual == expected {
        Ok(())
    } else {
        Err(DecodeError::InvalidWireType(actual as u8))
    }
}

/// Decode a varint (LEB128) with iteration limit to prevent infinite loops.
///
/// Varints can be at most 10 bytes for 64-bit values. The 10th byte can only
/// have its lowest bit set (representing bit 63 of the result).
fn decode_varint(buf: &mut &[u8]) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for i in 0..MAX_VARINT_BYTES {
        if !buf.has_remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        let byte = buf.get_u8();

        // The 10th byte may only carry bit 63.
        if shift == 63 && (byte & 0x7E) != 0 {
            return Err(DecodeError::InvalidVarint);
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;

        if i == MAX_VARINT_BYTES - 1 {
            return Err(DecodeError::InvalidVarint);
        }
    }

    Err(DecodeError::InvalidVarint)
}

/// Decode an `int32` field. Negative values are sign-extended to ten bytes
/// on the wire, so truncation recovers them.
fn decode_int32(buf: &mut &[u8], wire_type: WireType) -> Result<i32, DecodeError> {
    expect_wire_type(wire_type, WireType::Varint)?;
    Ok(decode_varint(buf)? as i32)
}

fn decode_bool(buf: &mut &[u8], wire_type: WireType) -> Result<bool, DecodeError> {
    expect_wire_type(wire_type, WireType::Varint)?;
    Ok(decode_varint(buf)? != 0)
}

/// Decode a length value and validate it's within bounds.
fn decode_len(buf: &mut &[u8]) -> Result<usize, DecodeError> {
    let len = decode_varint(buf)?;
    if len > MAX_MESSAGE_SIZE as u64 {
        return Err(DecodeError::MessageTooLarge(len));
    }
    let len = len as usize;
    if buf.remaining() < len {
        return Err(DecodeError::UnexpectedEof);
    }
    Ok(len)
}

/// Split off the bytes of a length-delimited sub-message.
fn decode_nested<'a>(buf: &mut &'a [u8], wire_type: WireType) -> Result<&'a [u8], DecodeError> {
    expect_wire_type(wire_type, WireType::Len)?;
    let len = decode_len(buf)?;
    let data: &'a [u8] = *buf;
    let (msg, rest) = data.split_at(len);
    *buf = rest;
    Ok(msg)
}

/// Decode a length-delimited string.
fn decode_string(buf: &mut &[u8], wire_type: WireType) -> Result<String, DecodeError> {
    let data = decode_nested(buf, wire_type)?;
    std::str::from_utf8(data)
        .map(str::to_string)
        .map_err(|_| DecodeError::InvalidUtf8)
}

/// Skip a field based on its wire type.
fn skip_field(buf: &mut &[u8], wire_type: WireType) -> Result<(), DecodeError> {
    match wire_type {
        WireType::Varint => {
            decode_varint(buf)?;
        }
        WireType::I64 => {
            if buf.remaining() < 8 {
                return Err(DecodeError::UnexpectedEof);
            }
            buf.advance(8);
        }
        WireType::Len => {
            let len = decode_len(buf)?;
            buf.advance(len);
        }
        WireType::I32 => {
            if buf.remaining() < 4 {
                return Err(DecodeError::UnexpectedEof);
            }
            buf.advance(4);
        }
        WireType::SGroup | WireType::EGroup => {
            return Err(DecodeError::InvalidWireType(wire_type as u8));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::property_test;

    use super::*;

    fn varint(mut value: u64, out: &mut Vec<u8>) {
        while value >= 0x80 {
            out.push((value as u8) | 0x80);
            value >>= 7;
        }
        out.push(value as u8);
    }

    fn len_field(field: u32, payload: &[u8], out: &mut Vec<u8>) {
        varint(((field << 3) | 2) as u64, out);
        varint(payload.len() as u64, out);
        out.extend_from_slice(payload);
    }

    fn varint_field(field: u32, value: u64, out: &mut Vec<u8>) {
        varint((field << 3) as u64, out);
        varint(value, out);
    }

    #[test]
    fn test_decode_varint() {
        let mut buf: &[u8] = &[0x01];
        assert_eq!(decode_varint(&mut buf).unwrap(), 1);

        // 300 = 0xAC 0x02
        let mut buf: &[u8] = &[0xAC, 0x02];
        assert_eq!(decode_varint(&mut buf).unwrap(), 300);

        let mut buf: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(decode_varint(&mut buf).unwrap(), u64::MAX);
    }

    #[test]
    fn test_decode_varint_overflow() {
        let mut buf: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert!(matches!(decode_varint(&mut buf), Err(DecodeError::InvalidVarint)));

        let mut buf: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x81, 0x00];
        assert!(matches!(decode_varint(&mut buf), Err(DecodeError::InvalidVarint)));
    }

    #[test]
    fn test_decode_varint_eof() {
        let mut buf: &[u8] = &[];
        assert!(matches!(decode_varint(&mut buf), Err(DecodeError::UnexpectedEof)));

        let mut buf: &[u8] = &[0x80];
        assert!(matches!(decode_varint(&mut buf), Err(DecodeError::UnexpectedEof)));
    }

    #[test]
    fn test_decode_string_invalid_utf8() {
        let mut buf: &[u8] = &[0x02, 0xFF, 0xFE];
        assert!(matches!(
            decode_string(&mut buf, WireType::Len),
            Err(DecodeError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_decode_string_truncated() {
        let mut buf: &[u8] = &[0x05, b'h', b'e', b'l'];
        assert!(matches!(
            decode_string(&mut buf, WireType::Len),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_decode_len_too_large() {
        // 128MB encoded as varint
        let mut buf: &[u8] = &[0x80, 0x80, 0x80, 0x40];
        assert!(matches!(decode_len(&mut buf), Err(DecodeError::MessageTooLarge(_))));
    }

    #[test]
    fn test_known_field_with_wrong_wire_type() {
        // FileDescriptorProto.name sent as a varint.
        let mut file = Vec::new();
        varint_field(1, 7, &mut file);
        let mut set = Vec::new();
        len_field(1, &file, &mut set);

        assert!(matches!(
            decode_file_descriptor_set(&set),
            Err(DecodeError::InvalidWireType(0))
        ));
    }

    #[test]
    fn test_decode_file_with_nested_types() {
        // enum Kind { KIND_A = 0; KIND_B = -1; }
        let mut value_a = Vec::new();
        len_field(1, b"KIND_A", &mut value_a);
        varint_field(2, 0, &mut value_a);
        let mut value_b = Vec::new();
        len_field(1, b"KIND_B", &mut value_b);
        varint_field(2, -1i64 as u64, &mut value_b);
        let mut kind = Vec::new();
        len_field(1, b"Kind", &mut kind);
        len_field(2, &value_a, &mut kind);
        len_field(2, &value_b, &mut kind);

        // message Outer { message Inner {} optional Inner inner = 4; enum Kind }
        let mut inner = Vec::new();
        len_field(1, b"Inner", &mut inner);
        let mut field = Vec::new();
        len_field(1, b"inner", &mut field);
        varint_field(3, 4, &mut field);
        varint_field(4, 1, &mut field);
        varint_field(5, 11, &mut field);
        len_field(6, b".demo.Outer.Inner", &mut field);
        let mut outer = Vec::new();
        len_field(1, b"Outer", &mut outer);
        len_field(2, &field, &mut outer);
        len_field(3, &inner, &mut outer);
        len_field(4, &kind, &mut outer);

        let mut file = Vec::new();
        len_field(1, b"demo.proto", &mut file);
        len_field(2, b"demo", &mut file);
        len_field(3, b"other.proto", &mut file);
        len_field(4, &outer, &mut file);
        // source_code_info (field 9) is skipped
        len_field(9, &[0x08, 0x01], &mut file);
        len_field(12, b"proto3", &mut file);

        let mut set = Vec::new();
        len_field(1, &file, &mut set);

        let fds = decode_file_descriptor_set(&set).unwrap();
        assert_eq!(fds.file.len(), 1);
        let file = &fds.file[0];
        assert_eq!(file.name.as_deref(), Some("demo.proto"));
        assert_eq!(file.package(), "demo");
        assert_eq!(file.dependency, vec!["other.proto".to_string()]);
        assert!(file.is_proto3());

        let outer = &file.message_type[0];
        assert_eq!(outer.name.as_deref(), Some("Outer"));
        assert_eq!(outer.nested_type[0].name.as_deref(), Some("Inner"));
        assert_eq!(outer.field[0].number, Some(4));
        assert_eq!(outer.field[0].field_type(), Some(Type::Message));
        assert_eq!(outer.field[0].label(), Label::Optional);
        assert_eq!(outer.field[0].type_name.as_deref(), Some(".demo.Outer.Inner"));
        assert_eq!(outer.enum_type[0].value[1].number, Some(-1));
    }

    #[test]
    fn test_decode_from_reader() {
        let mut file = Vec::new();
        len_field(1, b"a.proto", &mut file);
        let mut set = Vec::new();
        len_field(1, &file, &mut set);
        len_field(1, &file, &mut set);

        let fds = decode_file_descriptor_set_from(std::io::Cursor::new(set)).unwrap();
        assert_eq!(fds.file_names().collect::<Vec<_>>(), vec!["a.proto", "a.proto"]);
    }

    #[test]
    fn test_truncated_set_fails() {
        let mut file = Vec::new();
        len_field(1, b"a.proto", &mut file);
        let mut set = Vec::new();
        len_field(1, &file, &mut set);
        set.pop();

        assert!(matches!(
            decode_file_descriptor_set(&set),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[property_test]
    fn proptest_decode_never_panics(data: Vec<u8>) {
        let _ = decode_file_descriptor_set(&data);
    }

    #[property_test]
    fn proptest_decode_key(field: u32, wire: u8) {
        let field = field >> 3;
        let wire = wire % 6;
        let mut buf = Vec::new();
        varint(((field as u64) << 3) | wire as u64, &mut buf);
        let (rnd_field, rnd_wire) = decode_key(&mut &buf[..]).unwrap();
        prop_assert_eq!(rnd_field, field);
        prop_assert_eq!(rnd_wire as u8, wire);
    }
}
