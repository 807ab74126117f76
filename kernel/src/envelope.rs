//! Wire envelope and payload codecs.
//!
//! Every queued call travels as an [`Envelope`]: the target service, the
//! method within it, and an opaque payload holding the serialized argument.
//! The envelope itself is protobuf-encoded. The payload is only decoded once
//! the registry has resolved the method, through a [`Decoder`].

use bytes::Bytes;
use prost::Message;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tonic::Status;

/// Errors raised while encoding or decoding envelopes and payloads.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The envelope does not name a service.
    #[error("envelope has an empty service name")]
    EmptyService,
    /// The envelope does not name a method.
    #[error("envelope has an empty method name")]
    EmptyMethod,
    /// Bytes are not a well-formed protobuf message.
    #[error("protobuf decode failed: {0}")]
    Protobuf(#[from] prost::DecodeError),
    /// JSON payload could not be serialized or deserialized.
    #[error("json codec failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CodecError> for Status {
    fn from(err: CodecError) -> Self {
        Status::invalid_argument(err.to_string())
    }
}

/// The queued form of a single call.
///
/// Field tags match the `QueueItem` protobuf schema so that producers and
/// consumers written against that schema interoperate.
#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    /// Registered service name, e.g. `proto.Test`.
    #[prost(string, tag = "1")]
    pub service: String,
    /// Method name within the service, e.g. `TestRPC`.
    #[prost(string, tag = "2")]
    pub method: String,
    /// Serialized call argument. Never inspected by the envelope codec.
    #[prost(bytes = "bytes", tag = "3")]
    pub payload: Bytes,
}

impl Envelope {
    /// Creates an envelope from already-serialized payload bytes.
    pub fn new(service: impl Into<String>, method: impl Into<String>, payload: Bytes) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            payload,
        }
    }

    /// Serializes `argument` and wraps it for `service`/`method`, returning the
    /// wire bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if either name is empty or the argument cannot be
    /// serialized.
    pub fn encode_call<A: WireMessage>(
        service: &str,
        method: &str,
        argument: &A,
    ) -> Result<Bytes, CodecError> {
        let payload = argument.to_payload()?;
        Self::new(service, method, payload).to_bytes()
    }

    /// Encodes the envelope to wire bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the service or method name is empty.
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        self.validate()?;
        Ok(Bytes::from(self.encode_to_vec()))
    }

    /// Decodes the envelope shell from wire bytes. The payload is left opaque.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a protobuf envelope or if the
    /// decoded envelope has an empty service or method name.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let envelope = <Self as Message>::decode(data)?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Returns a decoder bound to this envelope's payload.
    #[must_use]
    pub fn decoder(&self) -> Decoder {
        Decoder::new(self.payload.clone())
    }

    fn validate(&self) -> Result<(), CodecError> {
        if self.service.is_empty() {
            return Err(CodecError::EmptyService);
        }
        if self.method.is_empty() {
            return Err(CodecError::EmptyMethod);
        }
        Ok(())
    }
}

/// A call argument with a serialization scheme of its own.
///
/// Every protobuf message implements this through prost. Serde types opt in by
/// wrapping themselves in [`Json`].
pub trait WireMessage: Sized + Send + 'static {
    /// Serializes the argument into payload bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented in its wire format.
    fn to_payload(&self) -> Result<Bytes, CodecError>;

    /// Rebuilds the argument from payload bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoding of `Self`.
    fn from_payload(payload: &[u8]) -> Result<Self, CodecError>;
}

impl<T> WireMessage for T
where
    T: Message + Default + 'static,
{
    fn to_payload(&self) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(self.encode_to_vec()))
    }

    fn from_payload(payload: &[u8]) -> Result<Self, CodecError> {
        Ok(T::decode(payload)?)
    }
}

/// Carries a serde type as a JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> WireMessage for Json<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    fn to_payload(&self) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec(&self.0)?))
    }

    fn from_payload(payload: &[u8]) -> Result<Self, CodecError> {
        Ok(Self(serde_json::from_slice(payload)?))
    }
}

/// Payload-bound decode function handed to a method handler.
///
/// The handler picks the concrete type; a failed decode surfaces as an
/// `InvalidArgument` status.
#[derive(Debug, Clone)]
pub struct Decoder {
    payload: Bytes,
}

impl Decoder {
    /// Binds a decoder to raw payload bytes.
    #[must_use]
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Decodes the payload as `T`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the payload is not a valid `T`.
    pub fn decode<T: WireMessage>(&self) -> Result<T, Status> {
        T::from_payload(&self.payload).map_err(Status::from)
    }

    /// Returns the undecoded payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}
