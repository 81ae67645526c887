#[macro_export]
macro_rules! agg_mod {
    [ $( $name:ident $(,)? )+ ] => {
        $(
            pub mod $name;
        )+
    };
}

/// Text-backed enum: `as_str`, `ALL`, case-insensitive `FromStr` and `Display`.
#[macro_export]
macro_rules! impl_str_enum {
    ($enum_name:ident { $( $variant:ident => $text:literal ),+ $(,)? }) => {
        impl $enum_name {
            pub const ALL: &'static [$enum_name] = &[ $( $enum_name::$variant, )+ ];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $enum_name::$variant => $text, )+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = ::anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Ok($enum_name::$variant);
                    }
                )+
                Err(::anyhow::anyhow!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Maps a text-backed enum onto a Postgres TEXT column.
#[macro_export]
macro_rules! impl_pg_text_for_enum {
    ($enum_name:ident) => {
        impl sqlx::Type<sqlx::Postgres> for $enum_name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $enum_name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<$enum_name>()?)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $enum_name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}
