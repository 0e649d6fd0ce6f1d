// Known video encoders and the option tokens each one accepts

use std::sync::OnceLock;

/// Token lists for one encoder. Empty slices mean "no fixed choices".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderEntry {
    pub name: &'static str,
    pub presets: &'static [&'static str],
    pub profiles: &'static [&'static str],
    pub tunes: &'static [&'static str],
    pub pixel_formats: &'static [&'static str],
}

fn accepts(list: &[&str], token: &str) -> bool {
    token.is_empty() || list.is_empty() || list.contains(&token)
}

impl EncoderEntry {
    /// An empty token, or an encoder without a fixed list, always passes
    pub fn accepts_preset(&self, token: &str) -> bool {
        accepts(self.presets, token)
    }

    pub fn accepts_profile(&self, token: &str) -> bool {
        accepts(self.profiles, token)
    }

    pub fn accepts_tune(&self, token: &str) -> bool {
        accepts(self.tunes, token)
    }

    pub fn accepts_pixel_format(&self, token: &str) -> bool {
        accepts(self.pixel_formats, token)
    }
}

const X26X_PRESETS: &[&str] = &[
    "veryslow", "slower", "slow", "medium", "fast", "faster", "veryfast", "superfast",
    "ultrafast",
];
const NVENC_PRESETS: &[&str] = &["p7", "p6", "p5", "p4", "p3", "p2", "p1"];
const QSV_PRESETS: &[&str] = &[
    "veryslow", "slower", "slow", "medium", "fast", "faster", "veryfast",
];
const AMF_PRESETS: &[&str] = &["quality", "balanced", "speed"];
const AMF_TUNES: &[&str] = &[
    "transcoding",
    "ultralowlatency",
    "lowlatency",
    "webcam",
    "high_quality",
    "lowlatency_high_quality",
];
const AMF_PIX: &[&str] = &[
    "nv12", "yuv420p", "d3d11", "dxva2_vld", "p010le", "amf", "bgr0", "rgb0", "bgra", "argb",
    "rgba", "x2bgr10le", "rgbaf16le",
];
const NVENC_PIX: &[&str] = &[
    "yuv420p", "nv12", "p010le", "yuv444p", "p016le", "nv16", "p210le", "p216le", "yuv444p16le",
    "bgr0", "bgra", "rgb0", "rgba", "x2rgb10le", "x2bgr10le", "gbrp", "gbrp16le", "cuda", "d3d11",
];
const VULKAN_TUNES: &[&str] = &["hq", "ll", "ull", "lossless"];
const PRORES_PROFILES: &[&str] = &["auto", "proxy", "lt", "standard", "hq", "4444", "4444xq"];
const PRORES_PIX: &[&str] = &["yuv422p10le", "yuv444p10le", "yuva444p10le"];
const MAIN_MAIN10: &[&str] = &["main", "main10"];
const YUV420_8_10: &[&str] = &["yuv420p", "yuv420p10le"];

const fn entry(
    name: &'static str,
    presets: &'static [&'static str],
    profiles: &'static [&'static str],
    tunes: &'static [&'static str],
    pixel_formats: &'static [&'static str],
) -> EncoderEntry {
    EncoderEntry {
        name,
        presets,
        profiles,
        tunes,
        pixel_formats,
    }
}

const BUILTIN_ENTRIES: &[EncoderEntry] = &[
    entry("copy", &[], &[], &[], &[]),
    // VVC
    entry("libx266", X26X_PRESETS, MAIN_MAIN10, &[], YUV420_8_10),
    entry(
        "libvvenc",
        &["slower", "slow", "medium", "fast", "faster"],
        MAIN_MAIN10,
        &[],
        YUV420_8_10,
    ),
    // AV1
    entry(
        "libaom-av1",
        &["0", "1", "2", "3", "4", "5", "6", "7", "8"],
        &["0", "1", "2"],
        &["psnr", "ssim", "qmt"],
        &[
            "yuv420p", "yuv422p", "yuv444p", "gbrp", "yuv420p10le", "yuv422p10le", "yuv444p10le",
            "yuv420p12le", "yuv422p12le", "yuv444p12le", "gbrp10le", "gbrp12le", "gray",
            "gray10le", "gray12le",
        ],
    ),
    entry(
        "libsvtav1",
        &[
            "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13",
        ],
        &["main", "high", "professional"],
        &[],
        YUV420_8_10,
    ),
    entry(
        "av1_nvenc",
        NVENC_PRESETS,
        &["main", "high", "professional"],
        &["hq", "uhq", "ll", "ull", "lossless"],
        &[
            "yuv420p", "nv12", "p010le", "yuv444p", "p016le", "nv16", "p210le", "p216le",
            "yuv444p10le", "yuv444p16le", "bgr0", "bgra", "rgb0", "rgba", "x2rgb10le",
            "x2bgr10le", "gbrp", "gbrp10le", "gbrp16le", "cuda", "d3d11",
        ],
    ),
    entry(
        "av1_amf",
        &["high_quality", "quality", "balanced", "speed"],
        &["main"],
        &[],
        AMF_PIX,
    ),
    entry("av1_qsv", QSV_PRESETS, MAIN_MAIN10, &[], &["nv12", "p010le", "qsv"]),
    entry(
        "librav1e",
        &[],
        &[],
        &[],
        &[
            "yuv420p", "yuvj420p", "yuv420p10le", "yuv420p12le", "yuv422p", "yuvj422p",
            "yuv422p10le", "yuv422p12le", "yuv444p", "yuvj444p", "yuv444p10le", "yuv444p12le",
        ],
    ),
    // HEVC
    entry(
        "libx265",
        X26X_PRESETS,
        &["main", "mainstillpicture"],
        &[
            "psnr", "ssim", "grain", "fastdecode", "zerolatency", "animation", "stillimage",
        ],
        &[
            "yuv420p", "yuvj420p", "yuv422p", "yuvj422p", "yuv444p", "yuvj444p", "gbrp",
            "yuv420p10le", "yuv422p10le", "yuv444p10le", "gbrp10le", "yuv420p12le",
            "yuv422p12le", "yuv444p12le", "gbrp12le", "gray", "gray10le", "gray12le", "yuva420p",
            "yuva420p10le",
        ],
    ),
    entry(
        "hevc_nvenc",
        NVENC_PRESETS,
        &["main", "rext"],
        &["hq", "uhq", "ll", "ull", "lossless"],
        NVENC_PIX,
    ),
    entry("hevc_amf", AMF_PRESETS, &["main"], AMF_TUNES, AMF_PIX),
    entry(
        "hevc_qsv",
        QSV_PRESETS,
        &["main", "mainsp", "rext", "scc"],
        &[],
        &[
            "nv12", "p010le", "p012le", "yuyv422", "y210le", "qsv", "bgra", "x2rgb10le", "vuyx",
            "xv30le",
        ],
    ),
    entry("hevc_d3d12va", &[], MAIN_MAIN10, &[], &["d3d12"]),
    entry(
        "hevc_vulkan",
        &[],
        &["main", "main10", "rext"],
        VULKAN_TUNES,
        &["vulkan"],
    ),
    // H.264
    entry(
        "libx264",
        X26X_PRESETS,
        &["baseline", "main", "high", "high10", "high422", "high444"],
        &[
            "film", "animation", "grain", "stillimage", "psnr", "ssim", "fastdecode",
            "zerolatency",
        ],
        &[
            "yuv420p", "yuvj420p", "yuv422p", "yuvj422p", "yuv444p", "yuvj444p", "nv12", "nv16",
            "nv21", "yuv420p10le", "yuv422p10le", "yuv444p10le", "nv20le", "gray", "gray10le",
        ],
    ),
    entry(
        "h264_nvenc",
        NVENC_PRESETS,
        &["baseline", "main", "high", "high10", "high422", "high444p"],
        &["hq", "ll", "ull", "lossless"],
        NVENC_PIX,
    ),
    entry(
        "h264_amf",
        AMF_PRESETS,
        &["main", "high", "constrained_baseline", "constrained_high"],
        AMF_TUNES,
        AMF_PIX,
    ),
    entry("h264_qsv", QSV_PRESETS, &["baseline", "main", "high"], &[], &["nv12", "qsv"]),
    entry(
        "h264_vulkan",
        &[],
        &["main", "main10", "rext", "constrained_baseline"],
        VULKAN_TUNES,
        &["vulkan"],
    ),
    // ProRes
    entry("prores_ks", &[], PRORES_PROFILES, &[], PRORES_PIX),
    entry("prores_aw", &[], PRORES_PROFILES, &[], PRORES_PIX),
    // EVC
    entry(
        "libxeve",
        &["default", "slow", "medium", "fast"],
        &["main", "baseline"],
        &["psnr", "zerolatency", "none"],
        YUV420_8_10,
    ),
    // VP9 / VP8
    entry(
        "libvpx-vp9",
        &["0", "1", "2", "3", "4", "5"],
        &[],
        &["psnr", "ssim"],
        &[
            "yuv420p", "yuva420p", "yuv422p", "yuv440p", "yuv444p", "yuv420p10le", "yuv422p10le",
            "yuv440p10le", "yuv444p10le", "yuv420p12le", "yuv422p12le", "yuv440p12le",
            "yuv444p12le", "gbrp", "gbrp10le", "gbrp12le",
        ],
    ),
    entry("libvpx", &[], &[], &[], &["yuv420p", "yuva420p"]),
    // Intra / legacy / lossless
    entry("mpeg4", &[], &[], &[], &["yuv420p", "yuv422p", "yuv444p"]),
    entry("mjpeg", &[], &[], &[], &["yuvj420p", "yuvj422p", "yuvj444p"]),
    entry(
        "png",
        &[],
        &[],
        &[],
        &[
            "rgb24", "rgba", "rgb48be", "rgba64be", "pal8", "gray", "ya8", "gray16be", "ya16be",
            "monob",
        ],
    ),
    entry(
        "dnxhd",
        &[],
        &[
            "dnxhd", "dnxhr_lb", "dnxhr_sq", "dnxhr_hq", "dnxhr_hqx", "dnxhr_444",
        ],
        &[],
        &["yuv422p", "yuv422p10le", "yuv444p10le", "gbrp10le"],
    ),
    entry(
        "utvideo",
        &[],
        &[],
        &[],
        &[
            "yuv420p", "yuv422p", "yuv444p", "bgra", "rgba", "gbrp", "gbrap",
        ],
    ),
    entry(
        "ffv1",
        &[],
        &[],
        &[],
        &[
            "yuv420p", "yuva420p", "yuva422p", "yuv444p", "yuva444p", "yuv440p", "yuv422p",
            "yuv411p", "yuv410p", "bgr0", "bgra", "yuv420p16le", "yuv422p16le", "yuv444p16le",
            "yuv444p9le", "yuv422p9le", "yuv420p9le", "yuv420p10le", "yuv422p10le", "yuv444p10le",
            "yuv420p12le", "yuv422p12le", "yuv444p12le", "yuv440p10le", "yuv440p12le",
            "yuva444p16le", "yuva422p16le", "yuva420p16le", "yuva444p10le", "yuva422p10le",
            "yuva420p10le", "yuva444p9le", "yuva422p9le", "yuva420p9le", "gray16le", "gray",
            "gbrp", "gbrp9le", "gbrp10le", "gbrp12le", "gbrp14le", "gbrp16le", "gbrap",
            "gbrap10le", "gbrap12le", "gbrap14le", "gbrap16le",
        ],
    ),
    entry(
        "huffyuv",
        &[],
        &[],
        &[],
        &[
            "yuv420p", "yuv422p", "yuv444p", "yuva420p", "yuva422p", "yuva444p", "bgr24", "bgra",
            "rgb24", "rgba", "gbrap",
        ],
    ),
];

/// Encoder lookup table.
///
/// A fresh table is empty; any lookup fills it with the built-in entries
/// first. Use [`EncoderTable::builtin`] for a shared, read-only instance.
#[derive(Debug, Default, Clone)]
pub struct EncoderTable {
    entries: Vec<EncoderEntry>,
}

impl EncoderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide table, built on first use
    pub fn builtin() -> &'static EncoderTable {
        static TABLE: OnceLock<EncoderTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let mut table = EncoderTable::new();
            table.initialize();
            table
        })
    }

    /// Clear and repopulate with the built-in entries
    pub fn initialize(&mut self) {
        self.entries.clear();
        self.entries.extend_from_slice(BUILTIN_ENTRIES);
    }

    pub fn is_initialized(&self) -> bool {
        !self.entries.is_empty()
    }

    fn ensure_initialized(&mut self) {
        if !self.is_initialized() {
            self.initialize();
        }
    }

    /// Encoder names in definition order
    pub fn list(&mut self) -> Vec<&'static str> {
        self.ensure_initialized();
        self.entries.iter().map(|e| e.name).collect()
    }

    pub fn get(&mut self, name: &str) -> Option<EncoderEntry> {
        self.ensure_initialized();
        self.entries.iter().find(|e| e.name == name).copied()
    }

    pub fn supports(&mut self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Read-only lookup for an already initialized table
    pub fn entries(&self) -> &[EncoderEntry] {
        &self.entries
    }

    pub fn find(&self, name: &str) -> Option<&EncoderEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}
