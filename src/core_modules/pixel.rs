// THEORY:
// The `Pixel` module is the smallest unit of the analysis pipeline. It is a "dumb"
// data container for one RGB sample of a stained tissue section, plus the single
// heuristic the segmenter needs from it: a luminance level.
//
// Key architectural principles:
// 1.  **Data Purity**: It holds the raw `u8` channel values in fixed R, G, B order,
//     whatever order the decoder stored them in.
// 2.  **Intrinsic Knowledge**: `luminance` depends only on this pixel's own channels.
//     Anything that needs other pixels (histograms, thresholds) lives in
//     `histogram` and `segmenter`.
// 3.  **Exact Integer Math**: Luminance is computed with the Rec. 601 weights in
//     14-bit fixed point and rounded, so the same bytes always land in the same
//     histogram bin on every platform.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    /// An 8-bit luminance level, usable directly as a histogram bin index.
    pub type Luminance = u8;

    pub const CHANNELS: usize = 3;

    // Rec. 601 weights scaled by 2^14. They sum to exactly 1 << 14.
    const RED_WEIGHT: u32 = 4899;
    const GREEN_WEIGHT: u32 = 9617;
    const BLUE_WEIGHT: u32 = 1868;
    const FIXED_POINT_SHIFT: u32 = 14;
    const ROUNDING: u32 = 1 << (FIXED_POINT_SHIFT - 1);

    /// A "dumb" data container representing a single RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Pixel {
        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        /// A neutral pixel whose three channels share one value.
        pub const fn gray(level: Channel) -> Self {
            Pixel::new(level, level, level)
        }

        /// Luminance estimate (Rec. 601 luma), rounded to the nearest 8-bit level.
        pub fn luminance(&self) -> Luminance {
            let weighted = RED_WEIGHT * self.red as u32
                + GREEN_WEIGHT * self.green as u32
                + BLUE_WEIGHT * self.blue as u32;
            ((weighted + ROUNDING) >> FIXED_POINT_SHIFT) as Luminance
        }

        pub fn channels(&self) -> [Channel; CHANNELS] {
            [self.red, self.green, self.blue]
        }
    }

    impl From<[Byte; CHANNELS]> for Pixel {
        fn from(bytes: [Byte; CHANNELS]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2])
        }
    }

    impl From<image::Rgb<u8>> for Pixel {
        fn from(rgb: image::Rgb<u8>) -> Self {
            Pixel::from(rgb.0)
        }
    }

    impl From<Pixel> for image::Rgb<u8> {
        fn from(pixel: Pixel) -> Self {
            image::Rgb(pixel.channels())
        }
    }
}
