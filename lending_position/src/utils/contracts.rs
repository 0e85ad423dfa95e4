use alloy::sol;

// Lending pool (Aave v2 fork) with native asset entry points
sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface LendingPoolContract {
        function getUserAccountData(address user) external view returns (
            uint256 totalCollateralETH,
            uint256 totalDebtETH,
            uint256 availableBorrowsETH,
            uint256 currentLiquidationThreshold,
            uint256 ltv,
            uint256 healthFactor
        );

        function getReserveData(address asset) external view returns (
            address aTokenAddress,
            address stableDebtTokenAddress,
            address variableDebtTokenAddress,
            address interestRateStrategyAddress,
            uint8 id
        );

        function depositETH(address asset, address onBehalfOf, uint16 referralCode) external payable;

        function withdrawETH(address asset, uint256 amount, address to) external returns (uint256);

        function withdraw(address asset, uint256 amount, address to) external returns (uint256);

        function borrowETH(
            address asset,
            uint256 amount,
            uint256 interestRateMode,
            uint16 referralCode
        ) external payable;

        function repayETH(
            address asset,
            uint256 amount,
            uint256 rateMode,
            address onBehalfOf
        ) external payable;

        function setUserUseReserveAsCollateral(address asset, bool useAsCollateral) external;
    }
);

// Receipt (aToken) and debt tokens share the ERC20 read surface
sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface Erc20Contract {
        function balanceOf(address account) external view returns (uint256);
    }
);

// Variable debt token credit delegation
sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface DebtTokenContract {
        function approveDelegation(address delegatee, uint256 amount) external;

        function borrowAllowance(address fromUser, address toUser) external view returns (uint256);
    }
);
