use crate::error::Result;
use crate::objects::{Dictionary, Object};
use crate::parser::filters;

/// Dictionary plus raw (possibly encoded) payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dictionary: Dictionary,
    data: Vec<u8>,
}

impl Stream {
    pub fn new(data: Vec<u8>) -> Self {
        let mut dictionary = Dictionary::new();
        dictionary.set("Length", data.len());

        Self { dictionary, data }
    }

    pub fn with_dictionary(dictionary: Dictionary, data: Vec<u8>) -> Self {
        let mut dict = dictionary;
        dict.set("Length", data.len());

        Self {
            dictionary: dict,
            data,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    /// Raw payload as stored in the file.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_filtered(&self) -> bool {
        self.dictionary.contains_key("Filter")
    }

    /// Payload with every `/Filter` undone.
    pub fn decoded_data(&self) -> Result<Vec<u8>> {
        Ok(filters::decode_stream(&self.data, &self.dictionary)?)
    }

    /// Replaces the payload with unencoded bytes and drops the filter chain.
    pub fn set_decoded_data(&mut self, data: Vec<u8>) {
        self.dictionary.remove("Filter");
        self.dictionary.remove("DecodeParms");
        self.dictionary.set("Length", data.len());
        self.data = data;
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.dictionary.set("Filter", Object::name(filter));
    }

    /// Flate-encodes an unfiltered payload. Already filtered streams are left alone.
    #[cfg(feature = "compression")]
    pub fn compress_flate(&mut self) -> Result<()> {
        if self.is_filtered() {
            return Ok(());
        }
        self.data = filters::encode_flate(&self.data)?;
        self.dictionary.set("Length", self.data.len());
        self.set_filter("FlateDecode");

        Ok(())
    }

    #[cfg(not(feature = "compression"))]
    pub fn compress_flate(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_length_tracks_payload() {
        let stream = Stream::new(b"q Q".to_vec());
        assert_eq!(stream.dictionary().get_integer("Length"), Some(3));
        assert!(!stream.is_filtered());
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_compress_then_decode() {
        let content = b"BT /F1 12 Tf 100 700 Td (Datum) Tj ET".repeat(20);
        let mut stream = Stream::new(content.clone());
        stream.compress_flate().unwrap();

        assert_eq!(stream.dictionary().get_name("Filter"), Some("FlateDecode"));
        assert!(stream.data().len() < content.len());
        assert_eq!(stream.decoded_data().unwrap(), content);
    }

    #[test]
    fn test_set_decoded_data_drops_filters() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("ASCIIHexDecode"));
        let mut stream = Stream::with_dictionary(dict, b"41>".to_vec());
        assert_eq!(stream.decoded_data().unwrap(), b"A");

        stream.set_decoded_data(b"B".to_vec());
        assert!(!stream.is_filtered());
        assert_eq!(stream.data(), b"B");
        assert_eq!(stream.dictionary().get_integer("Length"), Some(1));
    }
}
