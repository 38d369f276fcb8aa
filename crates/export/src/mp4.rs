//! Minimal ISO-BMFF muxer for recorded chunk streams.
//!
//! Produces a single-track progressive MP4: `ftyp`, one `mdat` holding
//! every sample back to back, and a `moov` whose sample table indexes
//! them at a fixed frame rate. Only the two chunk codecs the recorder
//! emits are supported, MJPEG (`jpeg` sample entry) and uncompressed
//! RGB24 (`raw `).

const MATRIX_IDENTITY: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

/// Sample entry tag recorded into `stsd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCodec {
    Mjpeg,
    Raw,
}

impl SampleCodec {
    fn tag(self) -> &'static [u8; 4] {
        match self {
            SampleCodec::Mjpeg => b"jpeg",
            SampleCodec::Raw => b"raw ",
        }
    }
}

/// Muxes pre-encoded samples into an MP4 byte stream.
#[derive(Debug)]
pub struct Mp4Muxer {
    width: u32,
    height: u32,
    fps: u32,
    codec: SampleCodec,
}

impl Mp4Muxer {
    pub fn new(width: u32, height: u32, fps: u32, codec: SampleCodec) -> Self {
        Self {
            width,
            height,
            fps: fps.max(1),
            codec,
        }
    }

    /// Ticks per second of the media timeline.
    fn timescale(&self) -> u32 {
        self.fps * 100
    }

    fn sample_delta(&self) -> u32 {
        self.timescale() / self.fps
    }

    fn duration_ticks(&self, sample_count: usize) -> u32 {
        sample_count as u32 * self.sample_delta()
    }

    /// Assembles the full container around the given samples.
    pub fn mux(&self, samples: &[Vec<u8>]) -> Vec<u8> {
        let mut out = ftyp();
        // stco points at the first payload byte, right after the ftyp
        // box and the mdat header.
        let mdat_payload_offset = out.len() as u32 + 8;

        let payload_len: usize = samples.iter().map(Vec::len).sum();
        push_header(&mut out, b"mdat", payload_len);
        for sample in samples {
            out.extend_from_slice(sample);
        }

        out.extend_from_slice(&boxed(
            b"moov",
            &[
                self.mvhd(samples.len()),
                boxed(
                    b"trak",
                    &[
                        self.tkhd(samples.len()),
                        boxed(
                            b"mdia",
                            &[
                                self.mdhd(samples.len()),
                                hdlr(),
                                boxed(
                                    b"minf",
                                    &[
                                        vmhd(),
                                        boxed(b"dinf", &[dref()]),
                                        boxed(
                                            b"stbl",
                                            &[
                                                self.stsd(),
                                                self.stts(samples.len()),
                                                stsc(samples.len()),
                                                stsz(samples),
                                                stco(mdat_payload_offset),
                                            ],
                                        ),
                                    ],
                                ),
                            ],
                        ),
                    ],
                ),
            ],
        ));

        out
    }

    fn mvhd(&self, sample_count: usize) -> Vec<u8> {
        let mut body = vec![0, 0, 0, 0];
        put_u32(&mut body, 0); // creation time
        put_u32(&mut body, 0); // modification time
        put_u32(&mut body, self.timescale());
        put_u32(&mut body, self.duration_ticks(sample_count));
        put_u32(&mut body, 0x0001_0000); // rate 1.0
        body.extend_from_slice(&[0x01, 0x00]); // volume 1.0
        body.extend_from_slice(&[0u8; 10]);
        for value in MATRIX_IDENTITY {
            put_u32(&mut body, value);
        }
        body.extend_from_slice(&[0u8; 24]);
        put_u32(&mut body, 2); // next track id
        boxed(b"mvhd", &[body])
    }

    fn tkhd(&self, sample_count: usize) -> Vec<u8> {
        let mut body = vec![0, 0, 0, 3]; // track enabled and in movie
        put_u32(&mut body, 0); // creation time
        put_u32(&mut body, 0); // modification time
        put_u32(&mut body, 1); // track id
        put_u32(&mut body, 0);
        put_u32(&mut body, self.duration_ticks(sample_count));
        body.extend_from_slice(&[0u8; 8]);
        put_u16(&mut body, 0); // layer
        put_u16(&mut body, 0); // alternate group
        put_u16(&mut body, 0); // volume, video tracks are silent
        put_u16(&mut body, 0);
        for value in MATRIX_IDENTITY {
            put_u32(&mut body, value);
        }
        put_u32(&mut body, self.width << 16); // 16.16 fixed point
        put_u32(&mut body, self.height << 16);
        boxed(b"tkhd", &[body])
    }

    fn mdhd(&self, sample_count: usize) -> Vec<u8> {
        let mut body = vec![0, 0, 0, 0];
        put_u32(&mut body, 0);
        put_u32(&mut body, 0);
        put_u32(&mut body, self.timescale());
        put_u32(&mut body, self.duration_ticks(sample_count));
        put_u16(&mut body, 0x55c4); // language "und"
        put_u16(&mut body, 0);
        boxed(b"mdhd", &[body])
    }

    fn stsd(&self) -> Vec<u8> {
        let mut entry = vec![0u8; 6];
        put_u16(&mut entry, 1); // data reference index
        put_u16(&mut entry, 0);
        put_u16(&mut entry, 0);
        entry.extend_from_slice(&[0u8; 12]);
        put_u16(&mut entry, self.width as u16);
        put_u16(&mut entry, self.height as u16);
        put_u32(&mut entry, 0x0048_0000); // 72 dpi horizontal
        put_u32(&mut entry, 0x0048_0000); // 72 dpi vertical
        put_u32(&mut entry, 0);
        put_u16(&mut entry, 1); // frames per sample
        entry.extend_from_slice(&compressor_name(b"Lumo Export"));
        put_u16(&mut entry, 24); // depth
        entry.extend_from_slice(&(-1i16).to_be_bytes());

        let mut body = vec![0, 0, 0, 0];
        put_u32(&mut body, 1); // entry count
        put_u32(&mut body, (8 + entry.len()) as u32);
        body.extend_from_slice(self.codec.tag());
        body.extend_from_slice(&entry);
        boxed(b"stsd", &[body])
    }

    fn stts(&self, sample_count: usize) -> Vec<u8> {
        let mut body = vec![0, 0, 0, 0];
        put_u32(&mut body, 1);
        put_u32(&mut body, sample_count as u32);
        put_u32(&mut body, self.sample_delta());
        boxed(b"stts", &[body])
    }
}

fn ftyp() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"isom");
    put_u32(&mut body, 512); // minor version
    for brand in [b"isom", b"iso2", b"mp41"] {
        body.extend_from_slice(brand);
    }
    boxed(b"ftyp", &[body])
}

fn hdlr() -> Vec<u8> {
    let mut body = vec![0, 0, 0, 0];
    put_u32(&mut body, 0);
    body.extend_from_slice(b"vide");
    body.extend_from_slice(&[0u8; 12]);
    body.extend_from_slice(b"Lumo Video Handler\0");
    boxed(b"hdlr", &[body])
}

fn vmhd() -> Vec<u8> {
    let mut body = vec![0, 0, 0, 1];
    put_u16(&mut body, 0); // graphics mode copy
    body.extend_from_slice(&[0u8; 6]); // opcolor
    boxed(b"vmhd", &[body])
}

fn dref() -> Vec<u8> {
    let mut body = vec![0, 0, 0, 0];
    put_u32(&mut body, 1);
    put_u32(&mut body, 12); // url entry size
    body.extend_from_slice(b"url ");
    body.extend_from_slice(&[0, 0, 0, 1]); // media is self-contained
    boxed(b"dref", &[body])
}

fn stsc(sample_count: usize) -> Vec<u8> {
    let mut body = vec![0, 0, 0, 0];
    put_u32(&mut body, 1);
    put_u32(&mut body, 1); // first chunk
    put_u32(&mut body, sample_count as u32); // every sample in one chunk
    put_u32(&mut body, 1); // sample description index
    boxed(b"stsc", &[body])
}

fn stsz(samples: &[Vec<u8>]) -> Vec<u8> {
    let mut body = vec![0, 0, 0, 0];
    put_u32(&mut body, 0); // variable sample sizes
    put_u32(&mut body, samples.len() as u32);
    for sample in samples {
        put_u32(&mut body, sample.len() as u32);
    }
    boxed(b"stsz", &[body])
}

fn stco(payload_offset: u32) -> Vec<u8> {
    let mut body = vec![0, 0, 0, 0];
    put_u32(&mut body, 1);
    put_u32(&mut body, payload_offset);
    boxed(b"stco", &[body])
}

fn compressor_name(name: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[0] = name.len() as u8;
    padded[1..1 + name.len()].copy_from_slice(name);
    padded
}

/// Wraps the concatenated parts in a size-prefixed box.
fn boxed(tag: &[u8; 4], parts: &[Vec<u8>]) -> Vec<u8> {
    let payload_len: usize = parts.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(8 + payload_len);
    push_header(&mut out, tag, payload_len);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

fn push_header(out: &mut Vec<u8>, tag: &[u8; 4], payload_len: usize) {
    put_u32(out, (8 + payload_len) as u32);
    out.extend_from_slice(tag);
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}
