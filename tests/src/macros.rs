#[macro_export]
macro_rules! tests {
    (
        $(
            $( #[$attrs:meta] )*
            $f:ident
        ),+
    ) => {
        #[cfg(feature = "sqlite")]
        mod sqlite {
            $(
                #[test]
                $( #[$attrs] )*
                fn $f() {
                    let mut test = $crate::DbTest::new(
                        Box::new($crate::db::sqlite::SetupSqlite::new())
                    );

                    test.run_test(move |test| Box::pin(async move {
                        super::$f(test).await;
                    }));
                }
            )*
        }

        #[cfg(feature = "mysql")]
        mod mysql {
            $(
                #[test]
                $( #[$attrs] )*
                fn $f() {
                    let mut test = $crate::DbTest::new(
                        Box::new($crate::db::mysql::SetupMySQL::new())
                    );

                    test.run_test(move |test| Box::pin(async move {
                        super::$f(test).await;
                    }));
                }
            )*
        }

        #[cfg(feature = "postgresql")]
        mod postgresql {
            $(
                #[test]
                $( #[$attrs] )*
                fn $f() {
                    let mut test = $crate::DbTest::new(
                        Box::new($crate::db::postgresql::SetupPostgreSQL::new())
                    );

                    test.run_test(move |test| Box::pin(async move {
                        super::$f(test).await;
                    }));
                }
            )*
        }
    };
    (
        $(
            $( #[$attrs:meta] )*
            $f:ident,
        )+
    ) => {
        $crate::tests!( $(
            $( #[$attrs] )*
            $f
        ),+ );
    }
}
