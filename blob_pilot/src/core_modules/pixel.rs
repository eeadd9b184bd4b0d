// THEORY:
// The `pixel` module is the most fundamental unit of the tracker. It turns a raw
// RGB byte triple into the hue/saturation/value representation that every color
// threshold in the system is expressed in.
//
// Thresholding in raw RGB is unstable: the same orange ball under a lamp and in
// shade differs in all three channels. In HSV the hue stays put and only the
// value channel moves, so a range can be tuned once and survive lighting drift.
//
// Scale convention (8-bit, the one every camera tuning tool uses):
// - hue:        degrees / 2, so the full wheel fits in 0..=179
// - saturation: 0..=255, chroma relative to value
// - value:      0..=255, the brightest channel
//
// Achromatic pixels (chroma 0) have no meaningful hue and report 0. Black has
// saturation 0.

pub mod pixel {
    pub type Channel = u8;
    pub type Hue = u8;
    pub type Saturation = u8;
    pub type Value = u8;

    /// Upper bound (inclusive) of the 8-bit hue channel.
    pub const HUE_MAX: Hue = 179;

    /// A single pixel expressed in 8-bit HSV.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HsvPixel {
        pub hue: Hue,
        pub saturation: Saturation,
        pub value: Value,
    }

    impl HsvPixel {
        pub fn new(hue: Hue, saturation: Saturation, value: Value) -> Self {
            Self {
                hue,
                saturation,
                value,
            }
        }

        /// Converts an RGB triple into HSV.
        pub fn from_rgb(red: Channel, green: Channel, blue: Channel) -> Self {
            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let chroma = (maximum_channel - minimum_channel) as f32;

            let saturation = if maximum_channel == 0 {
                0
            } else {
                (chroma * 255.0 / maximum_channel as f32).round() as Saturation
            };

            if chroma == 0.0 {
                return Self::new(0, saturation, maximum_channel);
            }

            let (red, green, blue) = (red as f32, green as f32, blue as f32);
            let (base_difference, sector_offset) = if maximum_channel as f32 == red {
                (green - blue, 0.0)
            } else if maximum_channel as f32 == green {
                (blue - red, 120.0)
            } else {
                (red - green, 240.0)
            };

            let mut hue_degrees = 60.0 * base_difference / chroma + sector_offset;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }

            // 359.x degrees rounds to 180, which is the same angle as 0.
            let hue = (hue_degrees / 2.0).round() as u16;
            let hue = if hue > HUE_MAX as u16 { 0 } else { hue as Hue };

            Self::new(hue, saturation, maximum_channel)
        }

        /// The pixel as a `[h, s, v]` array, the layout color ranges are stored in.
        pub fn channels(&self) -> [u8; 3] {
            [self.hue, self.saturation, self.value]
        }
    }

    impl From<image::Rgb<u8>> for HsvPixel {
        fn from(rgb: image::Rgb<u8>) -> Self {
            let [red, green, blue] = rgb.0;
            Self::from_rgb(red, green, blue)
        }
    }
}
