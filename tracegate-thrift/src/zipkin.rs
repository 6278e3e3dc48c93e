//! Zipkin-core Thrift structs for the legacy UDP port and the collector's
//! `ZipkinCollector::submitZipkinBatch`.

use crate::jaeger::{read_lossy_string, read_struct_list, write_struct_list};
use crate::{field_id, protocol_error};
use thrift::protocol::{
    TFieldIdentifier, TInputProtocol, TOutputProtocol, TStructIdentifier, TType,
};

pub const ANNOTATION_CLIENT_SEND: &str = "cs";
pub const ANNOTATION_CLIENT_RECV: &str = "cr";
pub const ANNOTATION_SERVER_SEND: &str = "ss";
pub const ANNOTATION_SERVER_RECV: &str = "sr";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationType {
    Bool,
    Bytes,
    I16,
    I32,
    I64,
    Double,
    String,
}

impl AnnotationType {
    pub fn from_i32(value: i32) -> thrift::Result<Self> {
        match value {
            0 => Ok(AnnotationType::Bool),
            1 => Ok(AnnotationType::Bytes),
            2 => Ok(AnnotationType::I16),
            3 => Ok(AnnotationType::I32),
            4 => Ok(AnnotationType::I64),
            5 => Ok(AnnotationType::Double),
            6 => Ok(AnnotationType::String),
            other => Err(protocol_error(format!("unknown annotation type {other}"))),
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            AnnotationType::Bool => 0,
            AnnotationType::Bytes => 1,
            AnnotationType::I16 => 2,
            AnnotationType::I32 => 3,
            AnnotationType::I64 => 4,
            AnnotationType::Double => 5,
            AnnotationType::String => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Endpoint {
    pub ipv4: i32,
    pub port: i16,
    pub service_name: String,
}

impl Endpoint {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut endpoint = Endpoint::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => endpoint.ipv4 = i_prot.read_i32()?,
                2 => endpoint.port = i_prot.read_i16()?,
                3 => endpoint.service_name = read_lossy_string(i_prot)?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(endpoint)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Endpoint"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("ipv4", TType::I32, 1))?;
        o_prot.write_i32(self.ipv4)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("port", TType::I16, 2))?;
        o_prot.write_i16(self.port)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("service_name", TType::String, 3))?;
        o_prot.write_string(&self.service_name)?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotation {
    pub timestamp: i64,
    pub value: String,
    pub host: Option<Endpoint>,
}

impl Annotation {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut annotation = Annotation::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => annotation.timestamp = i_prot.read_i64()?,
                2 => annotation.value = read_lossy_string(i_prot)?,
                3 => annotation.host = Some(Endpoint::read(i_prot)?),
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(annotation)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Annotation"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("timestamp", TType::I64, 1))?;
        o_prot.write_i64(self.timestamp)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("value", TType::String, 2))?;
        o_prot.write_string(&self.value)?;
        o_prot.write_field_end()?;
        if let Some(host) = &self.host {
            o_prot.write_field_begin(&TFieldIdentifier::new("host", TType::Struct, 3))?;
            host.write(o_prot)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinaryAnnotation {
    pub key: String,
    pub value: Vec<u8>,
    pub annotation_type: i32,
    pub host: Option<Endpoint>,
}

impl BinaryAnnotation {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut annotation = BinaryAnnotation::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => annotation.key = read_lossy_string(i_prot)?,
                2 => annotation.value = i_prot.read_bytes()?,
                3 => annotation.annotation_type = i_prot.read_i32()?,
                4 => annotation.host = Some(Endpoint::read(i_prot)?),
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(annotation)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("BinaryAnnotation"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("key", TType::String, 1))?;
        o_prot.write_string(&self.key)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("value", TType::String, 2))?;
        o_prot.write_bytes(&self.value)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("annotation_type", TType::I32, 3))?;
        o_prot.write_i32(self.annotation_type)?;
        o_prot.write_field_end()?;
        if let Some(host) = &self.host {
            o_prot.write_field_begin(&TFieldIdentifier::new("host", TType::Struct, 4))?;
            host.write(o_prot)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Span {
    pub trace_id: i64,
    pub name: String,
    pub id: i64,
    pub parent_id: Option<i64>,
    pub annotations: Vec<Annotation>,
    pub binary_annotations: Vec<BinaryAnnotation>,
    pub debug: bool,
    pub timestamp: Option<i64>,
    pub duration: Option<i64>,
    pub trace_id_high: Option<i64>,
}

impl Span {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut span = Span::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => span.trace_id = i_prot.read_i64()?,
                3 => span.name = read_lossy_string(i_prot)?,
                4 => span.id = i_prot.read_i64()?,
                5 => span.parent_id = Some(i_prot.read_i64()?),
                6 => span.annotations = read_struct_list(i_prot, Annotation::read)?,
                8 => span.binary_annotations = read_struct_list(i_prot, BinaryAnnotation::read)?,
                9 => span.debug = i_prot.read_bool()?,
                10 => span.timestamp = Some(i_prot.read_i64()?),
                11 => span.duration = Some(i_prot.read_i64()?),
                12 => span.trace_id_high = Some(i_prot.read_i64()?),
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(span)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Span"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("trace_id", TType::I64, 1))?;
        o_prot.write_i64(self.trace_id)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("name", TType::String, 3))?;
        o_prot.write_string(&self.name)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("id", TType::I64, 4))?;
        o_prot.write_i64(self.id)?;
        o_prot.write_field_end()?;
        if let Some(parent_id) = self.parent_id {
            o_prot.write_field_begin(&TFieldIdentifier::new("parent_id", TType::I64, 5))?;
            o_prot.write_i64(parent_id)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_begin(&TFieldIdentifier::new("annotations", TType::List, 6))?;
        write_struct_list(o_prot, &self.annotations, Annotation::write)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("binary_annotations", TType::List, 8))?;
        write_struct_list(o_prot, &self.binary_annotations, BinaryAnnotation::write)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("debug", TType::Bool, 9))?;
        o_prot.write_bool(self.debug)?;
        o_prot.write_field_end()?;
        if let Some(timestamp) = self.timestamp {
            o_prot.write_field_begin(&TFieldIdentifier::new("timestamp", TType::I64, 10))?;
            o_prot.write_i64(timestamp)?;
            o_prot.write_field_end()?;
        }
        if let Some(duration) = self.duration {
            o_prot.write_field_begin(&TFieldIdentifier::new("duration", TType::I64, 11))?;
            o_prot.write_i64(duration)?;
            o_prot.write_field_end()?;
        }
        if let Some(trace_id_high) = self.trace_id_high {
            o_prot.write_field_begin(&TFieldIdentifier::new("trace_id_high", TType::I64, 12))?;
            o_prot.write_i64(trace_id_high)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Response {
    pub ok: bool,
}

impl Response {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut response = Response::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => response.ok = i_prot.read_bool()?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(response)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Response"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("ok", TType::Bool, 1))?;
        o_prot.write_bool(self.ok)?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

/// Decodes the bare binary-protocol span list posted to the legacy zipkin
/// HTTP ingest route.
pub fn decode_binary_span_list(bytes: &[u8]) -> thrift::Result<Vec<Span>> {
    let mut reader = bytes;
    let mut i_prot = thrift::protocol::TBinaryInputProtocol::new(&mut reader, true);
    read_struct_list(&mut i_prot, Span::read)
}
